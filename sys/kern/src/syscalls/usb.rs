// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! USB device control and the three class interfaces.
//!
//! HID, VCP and WebUSB calls have the same shapes, so each verifier here is
//! written once and instantiated per class.

use abi::wire::{Args, Ret};
use abi::{UsageError, UsbClassInfo, UsbDevInfo, UsbState};

use super::Cx;
use crate::drivers::UsbClassKind;
use crate::err::UserError;

pub(super) trait Class {
    const KIND: UsbClassKind;
}

pub(super) struct Hid;
pub(super) struct Vcp;
pub(super) struct WebUsb;

impl Class for Hid {
    const KIND: UsbClassKind = UsbClassKind::Hid;
}

impl Class for Vcp {
    const KIND: UsbClassKind = UsbClassKind::Vcp;
}

impl Class for WebUsb {
    const KIND: UsbClassKind = UsbClassKind::WebUsb;
}

pub(super) fn init(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let info: UsbDevInfo = cx.mem.copy_in(args.ptr(0))?;
    Ok(cx.hw.usb().init(&info).into())
}

pub(super) fn deinit(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    cx.hw.usb().deinit();
    Ok(Ret::None)
}

pub(super) fn start(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    Ok(cx.hw.usb().start().into())
}

pub(super) fn stop(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    cx.hw.usb().stop();
    Ok(Ret::None)
}

pub(super) fn get_event(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(cx.hw.usb().event()))
}

pub(super) fn get_state(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let out = cx.mem.out::<UsbState>(args.ptr(0))?;
    out.store(cx.hw.usb().state());
    Ok(Ret::None)
}

pub(super) fn add<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let info: UsbClassInfo = cx.mem.copy_in(args.ptr(0))?;
    // The descriptor length travels with the descriptor; it can't claim
    // more than the inline array holds.
    if usize::from(info.report_desc_len) > info.report_desc.len() {
        return Err(UsageError::OversizedInput.into());
    }
    Ok(cx.hw.usb_class(C::KIND).add(&info).into())
}

pub(super) fn can_read<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.usb_class(C::KIND).can_read(args.u8(0)).into())
}

pub(super) fn can_write<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.usb_class(C::KIND).can_write(args.u8(0)).into())
}

pub(super) fn read<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let buf = cx.mem.write(args.ptr(1), args.len(2))?;
    Ok(cx.hw.usb_class(C::KIND).read(args.u8(0), buf).into())
}

pub(super) fn write<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let buf = cx.mem.read(args.ptr(1), args.len(2))?;
    Ok(cx.hw.usb_class(C::KIND).write(args.u8(0), buf).into())
}

pub(super) fn read_select<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(cx.hw.usb_class(C::KIND).read_select(args.u32(0)).into())
}

pub(super) fn read_blocking<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let buf = cx.mem.write(args.ptr(1), args.len(2))?;
    let n = cx
        .hw
        .usb_class(C::KIND)
        .read_blocking(args.u8(0), buf, args.i32(3));
    Ok(n.into())
}

pub(super) fn write_blocking<C: Class>(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let buf = cx.mem.read(args.ptr(1), args.len(2))?;
    let n = cx
        .hw
        .usb_class(C::KIND)
        .write_blocking(args.u8(0), buf, args.i32(3));
    Ok(n.into())
}
