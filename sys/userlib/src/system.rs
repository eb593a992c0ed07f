// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::Arg;
use abi::{BootImage, SysEvents, Sysnum, UnitProperties, HW_ENTROPY_LEN, UPGRADE_HASH_LEN};

use crate::{input, out, syscall, unreachable_return};

/// Ends the task with a status code.
pub fn sys_exit(code: i32) -> ! {
    syscall(Sysnum::SystemExit, &[Arg::I32(code)]);
    unreachable_return()
}

/// Ends the task and has the platform show an error screen. Each string is
/// cut at 63 bytes or the first NUL.
pub fn sys_exit_error(title: &[u8], message: &[u8], footer: &[u8]) -> ! {
    let [tp, tl] = Arg::buf(title);
    let [mp, ml] = Arg::buf(message);
    let [fp, fl] = Arg::buf(footer);
    syscall(Sysnum::SystemExitError, &[tp, tl, mp, ml, fp, fl]);
    unreachable_return()
}

/// Ends the task after a failed internal check.
pub fn sys_exit_fatal(message: &[u8], file: &[u8], line: i32) -> ! {
    let [mp, ml] = Arg::buf(message);
    let [fp, fl] = Arg::buf(file);
    syscall(Sysnum::SystemExitFatal, &[mp, ml, fp, fl, Arg::I32(line)]);
    unreachable_return()
}

pub fn sys_reboot_device() -> ! {
    syscall(Sysnum::RebootDevice, &[]);
    unreachable_return()
}

pub fn sys_reboot_to_bootloader() -> ! {
    syscall(Sysnum::RebootToBootloader, &[]);
    unreachable_return()
}

/// Reboots into the bootloader to install the firmware with `hash`.
pub fn sys_reboot_and_upgrade(hash: &[u8; UPGRADE_HASH_LEN]) -> ! {
    syscall(Sysnum::RebootAndUpgrade, &[input(hash)]);
    unreachable_return()
}

pub fn sys_systick_cycles() -> u64 {
    syscall(Sysnum::SystickCycles, &[]).as_u64()
}

pub fn sys_systick_ms() -> u32 {
    syscall(Sysnum::SystickMs, &[]).as_u32()
}

pub fn sys_systick_us() -> u64 {
    syscall(Sysnum::SystickUs, &[]).as_u64()
}

pub fn sys_systick_us_to_cycles(us: u64) -> u64 {
    syscall(Sysnum::SystickUsToCycles, &[Arg::U64(us)]).as_u64()
}

/// Blocks until something in `awaited` is ready or `deadline` passes, and
/// returns what's ready.
pub fn sys_sysevents_poll(awaited: &SysEvents, deadline: u32) -> SysEvents {
    let mut signalled = SysEvents::default();
    syscall(
        Sysnum::SysEventsPoll,
        &[input(awaited), out(&mut signalled), Arg::U32(deadline)],
    );
    signalled
}

pub fn sys_boot_image_check(image: &BootImage) -> bool {
    syscall(Sysnum::BootImageCheck, &[input(image)]).as_bool()
}

pub fn sys_boot_image_replace(image: &BootImage) {
    syscall(Sysnum::BootImageReplace, &[input(image)]);
}

pub fn sys_unit_properties_get() -> UnitProperties {
    let mut props = UnitProperties::default();
    syscall(Sysnum::UnitPropertiesGet, &[out(&mut props)]);
    props
}

pub fn sys_secret_bootloader_locked() -> abi::SecBool {
    syscall(Sysnum::SecretBootloaderLocked, &[]).as_secbool()
}

/// Reads the hardware entropy sources.
pub fn sys_entropy_get() -> [u8; HW_ENTROPY_LEN] {
    let mut buf = [0; HW_ENTROPY_LEN];
    syscall(Sysnum::EntropyGet, &[out(&mut buf)]);
    buf
}

pub fn sys_rng_get() -> u32 {
    syscall(Sysnum::RngGet, &[]).as_u32()
}
