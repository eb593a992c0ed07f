// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::Arg;
use abi::{Bitblt, FbInfo, Sysnum};

use crate::{input, out, syscall};

pub fn sys_display_set_backlight(level: i32) -> i32 {
    syscall(Sysnum::DisplaySetBacklight, &[Arg::U32(level as u32)]).as_i32()
}

pub fn sys_display_get_backlight() -> i32 {
    syscall(Sysnum::DisplayGetBacklight, &[]).as_i32()
}

pub fn sys_display_set_orientation(angle: i32) -> i32 {
    syscall(Sysnum::DisplaySetOrientation, &[Arg::U32(angle as u32)]).as_i32()
}

pub fn sys_display_get_orientation() -> i32 {
    syscall(Sysnum::DisplayGetOrientation, &[]).as_i32()
}

/// Locates the frame buffer. Once this returns, the task may draw into it
/// directly.
pub fn sys_display_get_fb_info() -> Option<FbInfo> {
    let mut info = FbInfo::default();
    syscall(Sysnum::DisplayGetFbInfo, &[out(&mut info)])
        .as_bool()
        .then_some(info)
}

pub fn sys_display_wait_for_sync() {
    syscall(Sysnum::DisplayWaitForSync, &[]);
}

pub fn sys_display_refresh() {
    syscall(Sysnum::DisplayRefresh, &[]);
}

pub fn sys_display_fill(bb: &Bitblt) {
    syscall(Sysnum::DisplayFill, &[input(bb)]);
}

/// Copies an RGB565 rectangle. `bb.src_row` must name `src_stride * height`
/// bytes the task can read.
pub fn sys_display_copy_rgb565(bb: &Bitblt) {
    syscall(Sysnum::DisplayCopyRgb565, &[input(bb)]);
}

/// Waits for the DMA2D engine to finish what it was last given.
pub fn sys_dma2d_wait() {
    syscall(Sysnum::Dma2dWait, &[]);
}

macro_rules! dma2d_stubs {
    ($($(#[$attr:meta])* $fn_name:ident => $nr:ident;)*) => {
        $(
            $(#[$attr])*
            pub fn $fn_name(bb: &Bitblt) -> bool {
                syscall(Sysnum::$nr, &[input(bb)]).as_bool()
            }
        )*
    };
}

dma2d_stubs! {
    /// Fills `dst_stride * height` bytes at `bb.dst_row`, which must be
    /// memory the task can write.
    sys_dma2d_rgb565_fill => Dma2dRgb565Fill;
    /// Like the fill, and also reads `src_stride * height` bytes at
    /// `bb.src_row`. The same holds for every copy and blend.
    sys_dma2d_rgb565_copy_mono4 => Dma2dRgb565CopyMono4;
    sys_dma2d_rgb565_copy_rgb565 => Dma2dRgb565CopyRgb565;
    sys_dma2d_rgb565_blend_mono4 => Dma2dRgb565BlendMono4;
    sys_dma2d_rgb565_blend_mono8 => Dma2dRgb565BlendMono8;
    sys_dma2d_rgba8888_fill => Dma2dRgba8888Fill;
    sys_dma2d_rgba8888_copy_mono4 => Dma2dRgba8888CopyMono4;
    sys_dma2d_rgba8888_copy_rgb565 => Dma2dRgba8888CopyRgb565;
    sys_dma2d_rgba8888_copy_rgba8888 => Dma2dRgba8888CopyRgba8888;
    sys_dma2d_rgba8888_blend_mono4 => Dma2dRgba8888BlendMono4;
    sys_dma2d_rgba8888_blend_mono8 => Dma2dRgba8888BlendMono8;
}
