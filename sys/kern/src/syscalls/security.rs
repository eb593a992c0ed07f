// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translations blob, firmware attestation and the secure element.

use abi::wire::{Args, Ret};
use arrayvec::ArrayVec;

use super::{present, Cx};
use crate::err::UserError;

/// Largest digest the secure element signs.
const MAX_DIGEST_LEN: usize = 64;

pub(super) fn translations_write(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let data = cx.mem.read(args.ptr(0), args.len(2))?;
    Ok(cx.hw.translations().write(data, args.u32(1)).into())
}

/// Returns the address of the stored blob, which lies in the assets area
/// the task can already read, and stores its length.
pub(super) fn translations_read(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let len_out = cx.mem.out::<u32>(args.ptr(0))?;
    let (addr, len) = cx.hw.translations().read(args.u32(1));
    len_out.store(len);
    Ok(Ret::Addr(addr))
}

pub(super) fn translations_erase(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.translations().erase().into())
}

pub(super) fn translations_area_bytesize(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(cx.hw.translations().area_bytesize()))
}

pub(super) fn firmware_get_vendor(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let buf = cx.mem.write(args.ptr(0), args.len(1))?;
    Ok(cx.hw.firmware().vendor(buf).into())
}

pub(super) fn firmware_hash_start(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let challenge = cx.mem.read(args.ptr(0), args.len(1))?;
    Ok(cx.hw.firmware().hash_start(challenge).into())
}

pub(super) fn firmware_hash_continue(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let hash = cx.mem.write(args.ptr(0), args.len(1))?;
    Ok(cx.hw.firmware().hash_continue(hash).into())
}

pub(super) fn optiga_sign(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let optiga = present(cx.hw.optiga())?;
    // The digest is copied so it can't alias the signature buffer.
    let digest: ArrayVec<u8, MAX_DIGEST_LEN> =
        cx.mem.copy_in_bytes(args.ptr(1), args.len(2))?;
    let sig_len_out = cx.mem.out::<u32>(args.ptr(5))?;
    let sig = cx.mem.write(args.ptr(3), args.len(4))?;
    let mut sig_len = 0;
    let r = optiga.sign(args.u8(0), &digest, sig, &mut sig_len);
    sig_len_out.store(sig_len as u32);
    Ok(r.into())
}

pub(super) fn optiga_cert_size(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let optiga = present(cx.hw.optiga())?;
    let out = cx.mem.out::<u32>(args.ptr(1))?;
    let mut size = 0;
    let ok = optiga.cert_size(args.u8(0), &mut size);
    out.store(size as u32);
    Ok(ok.into())
}

pub(super) fn optiga_read_cert(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let optiga = present(cx.hw.optiga())?;
    let len_out = cx.mem.out::<u32>(args.ptr(3))?;
    let cert = cx.mem.write(args.ptr(1), args.len(2))?;
    let mut len = 0;
    let ok = optiga.read_cert(args.u8(0), cert, &mut len);
    len_out.store(len as u32);
    Ok(ok.into())
}

pub(super) fn optiga_read_sec(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let optiga = present(cx.hw.optiga())?;
    let out = cx.mem.out::<u8>(args.ptr(0))?;
    let mut sec = 0;
    let ok = optiga.read_sec(&mut sec);
    out.store(sec);
    Ok(ok.into())
}

pub(super) fn optiga_random_buffer(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let optiga = present(cx.hw.optiga())?;
    let dest = cx.mem.write(args.ptr(0), args.len(1))?;
    Ok(optiga.random_buffer(dest).into())
}

pub(super) fn optiga_set_sec_max(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    present(cx.hw.optiga())?.set_sec_max();
    Ok(Ret::None)
}
