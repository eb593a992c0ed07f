// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task lifecycle, time, events, boot images and device identity.

use abi::wire::{Args, Ret};
use abi::{BootImage, SysEvents, UnitProperties, HW_ENTROPY_LEN, UPGRADE_HASH_LEN};

use super::Cx;
use crate::err::UserError;

pub(super) fn exit(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    Err(cx.task.exit(args.i32(0)).into())
}

pub(super) fn exit_error(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let title = cx.mem.text(args.ptr(0), args.len(1))?;
    let message = cx.mem.text(args.ptr(2), args.len(3))?;
    let footer = cx.mem.text(args.ptr(4), args.len(5))?;
    Err(cx.task.exit_error(&title, &message, &footer).into())
}

pub(super) fn exit_fatal(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let message = cx.mem.text(args.ptr(0), args.len(1))?;
    let file = cx.mem.text(args.ptr(2), args.len(3))?;
    Err(cx.task.exit_fatal(&message, &file, args.i32(4)).into())
}

pub(super) fn reboot_device(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    cx.hw.boot().reboot_device()
}

pub(super) fn reboot_to_bootloader(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    cx.hw.boot().reboot_to_bootloader()
}

pub(super) fn reboot_and_upgrade(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let hash: [u8; UPGRADE_HASH_LEN] = cx.mem.copy_in(args.ptr(0))?;
    cx.hw.boot().reboot_and_upgrade(&hash)
}

pub(super) fn systick_cycles(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W64(cx.hw.systick().cycles()))
}

pub(super) fn systick_ms(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(cx.hw.systick().ms()))
}

pub(super) fn systick_us(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W64(cx.hw.systick().us()))
}

pub(super) fn systick_us_to_cycles(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W64(cx.hw.systick().us_to_cycles(args.u64(0))))
}

pub(super) fn sysevents_poll(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let awaited: SysEvents = cx.mem.copy_in(args.ptr(0))?;
    let signalled = cx.mem.out::<SysEvents>(args.ptr(1))?;
    signalled.store(cx.hw.sysevents().poll(&awaited, args.u32(2)));
    Ok(Ret::None)
}

// Boot images are probed in two steps: the header, then the bytes it
// points at.

pub(super) fn boot_image_check(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let image: BootImage = cx.mem.copy_in(args.ptr(0))?;
    let bytes = cx.mem.read(image.image_ptr, image.image_size as usize)?;
    Ok(cx.hw.boot().image_check(&image, bytes).into())
}

pub(super) fn boot_image_replace(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let image: BootImage = cx.mem.copy_in(args.ptr(0))?;
    let bytes = cx.mem.read(image.image_ptr, image.image_size as usize)?;
    cx.hw.boot().image_replace(&image, bytes);
    Ok(Ret::None)
}

pub(super) fn unit_properties_get(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let out = cx.mem.out::<UnitProperties>(args.ptr(0))?;
    out.store(cx.hw.secret().unit_properties());
    Ok(Ret::None)
}

pub(super) fn bootloader_locked(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.secret().bootloader_locked().into())
}

pub(super) fn entropy_get(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let out = cx.mem.out::<[u8; HW_ENTROPY_LEN]>(args.ptr(0))?;
    let mut buf = [0; HW_ENTROPY_LEN];
    cx.hw.entropy().entropy(&mut buf);
    out.store(buf);
    Ok(Ret::None)
}

pub(super) fn rng_get(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(cx.hw.entropy().rng()))
}
