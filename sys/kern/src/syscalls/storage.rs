// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Secure storage.
//!
//! PINs and salts are copied into kernel buffers before the storage layer
//! sees them; it stretches and compares them at its leisure, and the task
//! can't change them underneath it.

use abi::wire::{Args, Ret};
use abi::{EXTERNAL_SALT_SIZE, MAX_PIN_LEN};
use arrayvec::ArrayVec;

use super::Cx;
use crate::drivers::Salt;
use crate::err::UserError;
use crate::umem::UserMem;

type Pin = ArrayVec<u8, MAX_PIN_LEN>;

fn pin(mem: &UserMem<'_>, ptr: usize, len: usize) -> Result<Pin, UserError> {
    mem.copy_in_bytes(ptr, len)
}

/// A null salt pointer means no salt.
fn salt(mem: &UserMem<'_>, ptr: usize) -> Result<Salt, UserError> {
    mem.copy_in_opt::<[u8; EXTERNAL_SALT_SIZE]>(ptr)
}

pub(super) fn unlock(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let pin = pin(&cx.mem, args.ptr(0), args.len(1))?;
    let salt = salt(&cx.mem, args.ptr(2))?;
    Ok(cx.hw.storage().unlock(&pin, &salt).into())
}

pub(super) fn lock(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    cx.hw.storage().lock();
    Ok(Ret::None)
}

pub(super) fn is_unlocked(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().is_unlocked().into())
}

pub(super) fn has_pin(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().has_pin().into())
}

pub(super) fn get_pin_rem(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(cx.hw.storage().pin_rem()))
}

pub(super) fn change_pin(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let old_pin = pin(&cx.mem, args.ptr(0), args.len(1))?;
    let new_pin = pin(&cx.mem, args.ptr(2), args.len(3))?;
    let old_salt = salt(&cx.mem, args.ptr(4))?;
    let new_salt = salt(&cx.mem, args.ptr(5))?;
    let ok = cx
        .hw
        .storage()
        .change_pin(&old_pin, &new_pin, &old_salt, &new_salt);
    Ok(ok.into())
}

pub(super) fn ensure_not_wipe_code(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let pin = pin(&cx.mem, args.ptr(0), args.len(1))?;
    cx.hw.storage().ensure_not_wipe_code(&pin);
    Ok(Ret::None)
}

pub(super) fn has_wipe_code(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().has_wipe_code().into())
}

pub(super) fn change_wipe_code(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let current = pin(&cx.mem, args.ptr(0), args.len(1))?;
    let salt = salt(&cx.mem, args.ptr(2))?;
    let wipe_code = pin(&cx.mem, args.ptr(3), args.len(4))?;
    Ok(cx
        .hw
        .storage()
        .change_wipe_code(&current, &salt, &wipe_code)
        .into())
}

pub(super) fn has(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().has(args.u16(0)).into())
}

/// `val` may be null with a zero `max_len` to ask only for the length.
pub(super) fn get(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let key = args.u16(0);
    let len_out = cx.mem.out::<u16>(args.ptr(3))?;
    let val = cx.mem.write(args.ptr(1), usize::from(args.u16(2)))?;
    let mut len = 0;
    let ok = cx.hw.storage().get(key, val, &mut len);
    len_out.store(len);
    Ok(ok.into())
}

pub(super) fn set(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let val = cx.mem.read(args.ptr(1), usize::from(args.u16(2)))?;
    Ok(cx.hw.storage().set(args.u16(0), val).into())
}

pub(super) fn delete(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().delete(args.u16(0)).into())
}

pub(super) fn set_counter(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.storage().set_counter(args.u16(0), args.u32(1)).into())
}

pub(super) fn next_counter(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let out = cx.mem.out::<u32>(args.ptr(1))?;
    let mut count = 0;
    let ok = cx.hw.storage().next_counter(args.u16(0), &mut count);
    out.store(count);
    Ok(ok.into())
}

pub(super) fn wipe(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    cx.hw.storage().wipe();
    Ok(Ret::None)
}
