// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Buttons, touch, haptics and the status LED. All optional.

use abi::wire::{Args, Ret};
use abi::ButtonEvent;

use super::{present, Cx};
use crate::err::UserError;

pub(super) fn button_get_event(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let input = present(cx.hw.input())?;
    let out = cx.mem.out::<ButtonEvent>(args.ptr(0))?;
    match input.button_event() {
        Some(event) => {
            out.store(event);
            Ok(true.into())
        }
        None => Ok(false.into()),
    }
}

pub(super) fn touch_get_event(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(Ret::W32(present(cx.hw.input())?.touch_event()))
}

pub(super) fn haptic_set_enabled(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    present(cx.hw.haptic())?.set_enabled(args.u32(0) != 0);
    Ok(Ret::None)
}

pub(super) fn haptic_get_enabled(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.haptic())?.enabled().into())
}

pub(super) fn haptic_test(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.haptic())?.test(args.u16(0)).into())
}

pub(super) fn haptic_play(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.haptic())?.play(args.u32(0)).into())
}

pub(super) fn haptic_play_custom(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let amplitude = args.i32(0).clamp(i8::MIN.into(), i8::MAX.into()) as i8;
    let r = present(cx.hw.haptic())?.play_custom(amplitude, args.u16(1));
    Ok(r.into())
}

pub(super) fn rgb_led_set_color(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    present(cx.hw.rgb_led())?.set_color(args.u32(0));
    Ok(Ret::None)
}
