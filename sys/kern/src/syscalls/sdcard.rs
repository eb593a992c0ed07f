// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! SD card access. Boards without a card slot treat every call here as
//! nonexistent.

use abi::wire::{Args, Ret};
use abi::{UsageError, SDCARD_BLOCK_SIZE};

use super::{present, Cx};
use crate::err::UserError;

/// Byte length of `count` blocks, or a violation if it doesn't fit in 32
/// bits. Checked before anything else about the call.
fn blocks_len(count: u32) -> Result<usize, UserError> {
    count
        .checked_mul(SDCARD_BLOCK_SIZE)
        .map(|n| n as usize)
        .ok_or(UsageError::LengthOverflow.into())
}

pub(super) fn power_on(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.sdcard())?.power_on().into())
}

pub(super) fn power_off(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    present(cx.hw.sdcard())?.power_off();
    Ok(Ret::None)
}

pub(super) fn is_present(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.sdcard())?.is_present().into())
}

pub(super) fn get_capacity(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W64(present(cx.hw.sdcard())?.capacity()))
}

pub(super) fn read_blocks(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let (block, count) = (args.u32(1), args.u32(2));
    let len = blocks_len(count)?;
    let card = present(cx.hw.sdcard())?;
    let dest = cx.mem.write(args.ptr(0), len)?;
    Ok(card.read_blocks(dest, block, count).into())
}

pub(super) fn write_blocks(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let (block, count) = (args.u32(1), args.u32(2));
    let len = blocks_len(count)?;
    let card = present(cx.hw.sdcard())?;
    let src = cx.mem.read(args.ptr(0), len)?;
    Ok(card.write_blocks(src, block, count).into())
}
