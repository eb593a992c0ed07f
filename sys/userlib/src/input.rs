// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::Arg;
use abi::{ButtonEvent, Sysnum};

use crate::{out, syscall};

pub fn sys_button_get_event() -> Option<ButtonEvent> {
    let mut event = ButtonEvent::default();
    syscall(Sysnum::ButtonGetEvent, &[out(&mut event)])
        .as_bool()
        .then_some(event)
}

/// Packed touch event, or 0 if there is none.
pub fn sys_touch_get_event() -> u32 {
    syscall(Sysnum::TouchGetEvent, &[]).as_u32()
}

pub fn sys_haptic_set_enabled(enabled: bool) {
    syscall(Sysnum::HapticSetEnabled, &[Arg::U32(enabled.into())]);
}

pub fn sys_haptic_get_enabled() -> bool {
    syscall(Sysnum::HapticGetEnabled, &[]).as_bool()
}

pub fn sys_haptic_test(duration_ms: u16) -> bool {
    syscall(Sysnum::HapticTest, &[Arg::U32(duration_ms.into())]).as_bool()
}

pub fn sys_haptic_play(effect: u32) -> bool {
    syscall(Sysnum::HapticPlay, &[Arg::U32(effect)]).as_bool()
}

pub fn sys_haptic_play_custom(amplitude: i8, duration_ms: u16) -> bool {
    syscall(
        Sysnum::HapticPlayCustom,
        &[Arg::I32(amplitude.into()), Arg::U32(duration_ms.into())],
    )
    .as_bool()
}

pub fn sys_rgb_led_set_color(color: u32) {
    syscall(Sysnum::RgbLedSetColor, &[Arg::U32(color)]);
}
