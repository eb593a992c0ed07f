// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bluetooth link to the radio co-processor. Optional.

use abi::wire::{Args, Ret};
use abi::{BleCommand, BleEvent, BleState};

use super::{present, Cx};
use crate::err::UserError;

pub(super) fn start(cx: &mut Cx<'_>, _args: &Args<'_>) -> Result<Ret, UserError> {
    present(cx.hw.ble())?.start();
    Ok(Ret::None)
}

pub(super) fn issue_command(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let ble = present(cx.hw.ble())?;
    let command: BleCommand = cx.mem.copy_in(args.ptr(0))?;
    Ok(ble.issue_command(&command).into())
}

pub(super) fn get_event(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let ble = present(cx.hw.ble())?;
    let out = cx.mem.out::<BleEvent>(args.ptr(0))?;
    match ble.event() {
        Some(event) => {
            out.store(event);
            Ok(true.into())
        }
        None => Ok(false.into()),
    }
}

pub(super) fn get_state(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let ble = present(cx.hw.ble())?;
    let out = cx.mem.out::<BleState>(args.ptr(0))?;
    out.store(ble.state());
    Ok(Ret::None)
}

pub(super) fn can_write(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.ble())?.can_write().into())
}

pub(super) fn write(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let ble = present(cx.hw.ble())?;
    let data = cx.mem.read(args.ptr(0), args.len(1))?;
    Ok(ble.write(data).into())
}

pub(super) fn can_read(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.ble())?.can_read().into())
}

pub(super) fn read(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError> {
    let ble = present(cx.hw.ble())?;
    let data = cx.mem.write(args.ptr(0), args.len(1))?;
    Ok(ble.read(data).into())
}
