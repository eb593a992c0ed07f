// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Secure storage and the SD card.

use abi::wire::Arg;
use abi::{SecBool, Sysnum, EXTERNAL_SALT_SIZE};

use crate::{out, syscall};

pub type ExternalSalt = [u8; EXTERNAL_SALT_SIZE];

fn salt_arg(s: Option<&ExternalSalt>) -> Arg {
    Arg::opt_ref(s)
}

pub fn sys_storage_unlock(pin: &[u8], salt: Option<&ExternalSalt>) -> SecBool {
    let [p, l] = Arg::buf(pin);
    syscall(Sysnum::StorageUnlock, &[p, l, salt_arg(salt)]).as_secbool()
}

pub fn sys_storage_lock() {
    syscall(Sysnum::StorageLock, &[]);
}

pub fn sys_storage_is_unlocked() -> SecBool {
    syscall(Sysnum::StorageIsUnlocked, &[]).as_secbool()
}

pub fn sys_storage_has_pin() -> SecBool {
    syscall(Sysnum::StorageHasPin, &[]).as_secbool()
}

/// Number of PIN attempts left.
pub fn sys_storage_get_pin_rem() -> u32 {
    syscall(Sysnum::StorageGetPinRem, &[]).as_u32()
}

pub fn sys_storage_change_pin(
    old_pin: &[u8],
    new_pin: &[u8],
    old_salt: Option<&ExternalSalt>,
    new_salt: Option<&ExternalSalt>,
) -> SecBool {
    let [op, ol] = Arg::buf(old_pin);
    let [np, nl] = Arg::buf(new_pin);
    syscall(
        Sysnum::StorageChangePin,
        &[op, ol, np, nl, salt_arg(old_salt), salt_arg(new_salt)],
    )
    .as_secbool()
}

/// Wipes the device if `pin` is the wipe code.
pub fn sys_storage_ensure_not_wipe_code(pin: &[u8]) {
    let [p, l] = Arg::buf(pin);
    syscall(Sysnum::StorageEnsureNotWipeCode, &[p, l]);
}

pub fn sys_storage_has_wipe_code() -> SecBool {
    syscall(Sysnum::StorageHasWipeCode, &[]).as_secbool()
}

pub fn sys_storage_change_wipe_code(
    pin: &[u8],
    salt: Option<&ExternalSalt>,
    wipe_code: &[u8],
) -> SecBool {
    let [p, l] = Arg::buf(pin);
    let [wp, wl] = Arg::buf(wipe_code);
    syscall(Sysnum::StorageChangeWipeCode, &[p, l, salt_arg(salt), wp, wl])
        .as_secbool()
}

pub fn sys_storage_has(key: u16) -> SecBool {
    syscall(Sysnum::StorageHas, &[Arg::U32(key.into())]).as_secbool()
}

/// Reads the value under `key` into `val`, and returns its full length.
/// Pass an empty `val` to ask only for the length.
pub fn sys_storage_get(key: u16, val: &mut [u8]) -> (SecBool, u16) {
    let max_len = u16::try_from(val.len()).unwrap_or(u16::MAX);
    let mut len = 0u16;
    let r = syscall(
        Sysnum::StorageGet,
        &[
            Arg::U32(key.into()),
            Arg::Ptr(val.as_mut_ptr() as usize),
            Arg::U32(max_len.into()),
            out(&mut len),
        ],
    );
    (r.as_secbool(), len)
}

/// Stores `val` under `key`. Values longer than `u16::MAX` bytes can't be
/// described to the kernel and are refused without a trap.
pub fn sys_storage_set(key: u16, val: &[u8]) -> SecBool {
    let Ok(len) = u16::try_from(val.len()) else {
        return SecBool::FALSE;
    };
    syscall(
        Sysnum::StorageSet,
        &[
            Arg::U32(key.into()),
            Arg::Ptr(val.as_ptr() as usize),
            Arg::U32(len.into()),
        ],
    )
    .as_secbool()
}

pub fn sys_storage_delete(key: u16) -> SecBool {
    syscall(Sysnum::StorageDelete, &[Arg::U32(key.into())]).as_secbool()
}

pub fn sys_storage_set_counter(key: u16, count: u32) -> SecBool {
    syscall(
        Sysnum::StorageSetCounter,
        &[Arg::U32(key.into()), Arg::U32(count)],
    )
    .as_secbool()
}

/// Advances the counter under `key` and returns its new value.
pub fn sys_storage_next_counter(key: u16) -> (SecBool, u32) {
    let mut count = 0u32;
    let r = syscall(
        Sysnum::StorageNextCounter,
        &[Arg::U32(key.into()), out(&mut count)],
    );
    (r.as_secbool(), count)
}

pub fn sys_storage_wipe() {
    syscall(Sysnum::StorageWipe, &[]);
}

pub fn sys_sdcard_power_on() -> bool {
    syscall(Sysnum::SdCardPowerOn, &[]).as_bool()
}

pub fn sys_sdcard_power_off() {
    syscall(Sysnum::SdCardPowerOff, &[]);
}

pub fn sys_sdcard_is_present() -> bool {
    syscall(Sysnum::SdCardIsPresent, &[]).as_bool()
}

/// Card capacity in bytes.
pub fn sys_sdcard_get_capacity() -> u64 {
    syscall(Sysnum::SdCardGetCapacity, &[]).as_u64()
}

/// Reads `count` blocks starting at `block` into `dest`, which must hold
/// `count * SDCARD_BLOCK_SIZE` bytes.
pub fn sys_sdcard_read_blocks(dest: &mut [u8], block: u32, count: u32) -> bool {
    syscall(
        Sysnum::SdCardReadBlocks,
        &[
            Arg::Ptr(dest.as_mut_ptr() as usize),
            Arg::U32(block),
            Arg::U32(count),
        ],
    )
    .as_bool()
}

pub fn sys_sdcard_write_blocks(src: &[u8], block: u32, count: u32) -> bool {
    syscall(
        Sysnum::SdCardWriteBlocks,
        &[
            Arg::Ptr(src.as_ptr() as usize),
            Arg::U32(block),
            Arg::U32(count),
        ],
    )
    .as_bool()
}
