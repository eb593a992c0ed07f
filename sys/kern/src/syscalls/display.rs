// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::{Args, Ret};
use abi::{Bitblt, FbInfo, UsageError};

use super::Cx;
use crate::err::UserError;

pub(super) fn set_backlight(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.display().set_backlight(args.u32(0) as i32).into())
}

pub(super) fn get_backlight(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.display().backlight().into())
}

pub(super) fn set_orientation(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.display().set_orientation(args.u32(0) as i32).into())
}

pub(super) fn get_orientation(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.display().orientation().into())
}

/// Reports the frame buffer and makes it the task's to draw into.
///
/// The buffer becomes part of every mode's region table, so the new mapping
/// is installed before the task sees the address. A buffer the MPU can't
/// map is reported as no buffer at all.
pub(super) fn get_fb_info(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let out = cx.mem.out::<FbInfo>(args.ptr(0))?;
    let mapped = cx.hw.display().fb_info().and_then(|info| {
        let size = info.stride.checked_mul(info.height as usize)?;
        let mpu = cx.mem.mpu();
        mpu.set_active_fb(info.ptr, size);
        mpu.refresh();
        mpu.inside_active_fb(info.ptr, size).then_some(info)
    });
    out.store(mapped.unwrap_or_default());
    Ok(mapped.is_some().into())
}

pub(super) fn wait_for_sync(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    cx.hw.display().wait_for_sync();
    Ok(Ret::None)
}

pub(super) fn refresh(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    cx.hw.display().refresh();
    Ok(Ret::None)
}

pub(super) fn fill(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let bb: Bitblt = cx.mem.copy_in(args.ptr(0))?;
    cx.hw.display().fill(&bb);
    Ok(Ret::None)
}

/// Bytes spanned by `height` rows of `stride` bytes, or a violation if that
/// doesn't fit in 32 bits.
pub(super) fn rows_len(stride: u32, height: u16) -> Result<usize, UserError> {
    stride
        .checked_mul(u32::from(height))
        .map(|n| n as usize)
        .ok_or(UsageError::LengthOverflow.into())
}

pub(super) fn copy_rgb565(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let bb: Bitblt = cx.mem.copy_in(args.ptr(0))?;
    let size = rows_len(bb.src_stride, bb.height)?;
    let src = cx.mem.read(bb.src_row, size)?;
    cx.hw.display().copy_rgb565(&bb, src);
    Ok(Ret::None)
}
