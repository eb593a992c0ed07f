// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DMA2D graphics acceleration.
//!
//! The engine reaches task memory by address after the call returns, so
//! nothing is borrowed here. Both rectangles are sized with a checked
//! multiply and checked against the task's regions before the engine is
//! started.

use abi::wire::{Args, Ret};
use abi::Bitblt;

use super::display::rows_len;
use super::{present, Cx};
use crate::drivers::Dma2dOp;
use crate::err::UserError;

pub(super) trait Op {
    const OP: Dma2dOp;
}

macro_rules! ops {
    ($($name:ident),* $(,)?) => {
        $(
            pub(super) struct $name;

            impl Op for $name {
                const OP: Dma2dOp = Dma2dOp::$name;
            }
        )*
    };
}

ops! {
    Rgb565Fill,
    Rgb565CopyMono4,
    Rgb565CopyRgb565,
    Rgb565BlendMono4,
    Rgb565BlendMono8,
    Rgba8888Fill,
    Rgba8888CopyMono4,
    Rgba8888CopyRgb565,
    Rgba8888CopyRgba8888,
    Rgba8888BlendMono4,
    Rgba8888BlendMono8,
}

pub(super) fn wait(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    present(cx.hw.dma2d())?.wait();
    Ok(Ret::None)
}

pub(super) fn start<O: Op>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let engine = present(cx.hw.dma2d())?;
    let bb: Bitblt = cx.mem.copy_in(args.ptr(0))?;

    let dst_len = rows_len(bb.dst_stride, bb.height)?;
    let src_len = if O::OP.reads_source() {
        Some(rows_len(bb.src_stride, bb.height)?)
    } else {
        None
    };

    cx.mem.check_write(bb.dst_row, dst_len)?;
    if let Some(len) = src_len {
        cx.mem.check_read(bb.src_row, len)?;
    }
    Ok(engine.start(O::OP, &bb).into())
}
