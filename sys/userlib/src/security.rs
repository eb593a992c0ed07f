// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translations blob, firmware attestation and the secure element.

use abi::wire::Arg;
use abi::Sysnum;

use crate::{out, syscall};

pub fn sys_translations_write(data: &[u8], offset: u32) -> bool {
    syscall(
        Sysnum::TranslationsWrite,
        &[
            Arg::Ptr(data.as_ptr() as usize),
            Arg::U32(offset),
            Arg::Len(data.len()),
        ],
    )
    .as_bool()
}

/// Locates the stored translations from `offset` on. Returns the address,
/// which lies in the assets area, and the length in bytes.
pub fn sys_translations_read(offset: u32) -> (usize, u32) {
    let mut len = 0u32;
    let addr = syscall(Sysnum::TranslationsRead, &[out(&mut len), Arg::U32(offset)])
        .as_addr();
    (addr, len)
}

pub fn sys_translations_erase() -> bool {
    syscall(Sysnum::TranslationsErase, &[]).as_bool()
}

pub fn sys_translations_area_bytesize() -> u32 {
    syscall(Sysnum::TranslationsAreaBytesize, &[]).as_u32()
}

pub fn sys_firmware_get_vendor(buf: &mut [u8]) -> bool {
    let [p, l] = Arg::buf_mut(buf);
    syscall(Sysnum::FirmwareGetVendor, &[p, l]).as_bool()
}

pub fn sys_firmware_hash_start(challenge: &[u8]) -> bool {
    let [p, l] = Arg::buf(challenge);
    syscall(Sysnum::FirmwareHashStart, &[p, l]).as_bool()
}

/// Advances the firmware hash. Returns progress in percent; at 100, `hash`
/// holds the result. Negative on failure.
pub fn sys_firmware_hash_continue(hash: &mut [u8]) -> i32 {
    let [p, l] = Arg::buf_mut(hash);
    syscall(Sysnum::FirmwareHashContinue, &[p, l]).as_i32()
}

/// Signs `digest` with key `index`. Returns the secure element's result
/// code and the signature length.
pub fn sys_optiga_sign(index: u8, digest: &[u8], sig: &mut [u8]) -> (i32, usize) {
    let [dp, dl] = Arg::buf(digest);
    let [sp, sl] = Arg::buf_mut(sig);
    let mut sig_len = 0u32;
    let r = syscall(
        Sysnum::OptigaSign,
        &[Arg::U32(index.into()), dp, dl, sp, sl, out(&mut sig_len)],
    );
    (r.as_i32(), sig_len as usize)
}

pub fn sys_optiga_cert_size(index: u8) -> Option<usize> {
    let mut size = 0u32;
    syscall(
        Sysnum::OptigaCertSize,
        &[Arg::U32(index.into()), out(&mut size)],
    )
    .as_bool()
    .then_some(size as usize)
}

/// Reads certificate `index` into `cert`, returning its length.
pub fn sys_optiga_read_cert(index: u8, cert: &mut [u8]) -> Option<usize> {
    let [p, l] = Arg::buf_mut(cert);
    let mut len = 0u32;
    syscall(
        Sysnum::OptigaReadCert,
        &[Arg::U32(index.into()), p, l, out(&mut len)],
    )
    .as_bool()
    .then_some(len as usize)
}

pub fn sys_optiga_read_sec() -> Option<u8> {
    let mut sec = 0u8;
    syscall(Sysnum::OptigaReadSec, &[out(&mut sec)])
        .as_bool()
        .then_some(sec)
}

pub fn sys_optiga_random_buffer(dest: &mut [u8]) -> bool {
    let [p, l] = Arg::buf_mut(dest);
    syscall(Sysnum::OptigaRandomBuffer, &[p, l]).as_bool()
}

pub fn sys_optiga_set_sec_max() {
    syscall(Sysnum::OptigaSetSecMax, &[]);
}
