// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::Arg;
use abi::{BleCommand, BleEvent, BleState, Sysnum};

use crate::{input, out, syscall};

pub fn sys_ble_start() {
    syscall(Sysnum::BleStart, &[]);
}

pub fn sys_ble_issue_command(command: &BleCommand) -> bool {
    syscall(Sysnum::BleIssueCommand, &[input(command)]).as_bool()
}

pub fn sys_ble_get_event() -> Option<BleEvent> {
    let mut event = BleEvent::default();
    syscall(Sysnum::BleGetEvent, &[out(&mut event)])
        .as_bool()
        .then_some(event)
}

pub fn sys_ble_get_state() -> BleState {
    let mut state = BleState::default();
    syscall(Sysnum::BleGetState, &[out(&mut state)]);
    state
}

pub fn sys_ble_can_write() -> bool {
    syscall(Sysnum::BleCanWrite, &[]).as_bool()
}

pub fn sys_ble_write(data: &[u8]) -> bool {
    let [p, l] = Arg::buf(data);
    syscall(Sysnum::BleWrite, &[p, l]).as_bool()
}

pub fn sys_ble_can_read() -> bool {
    syscall(Sysnum::BleCanRead, &[]).as_bool()
}

/// Reads whatever has arrived, up to `data.len()` bytes, and returns how
/// much that was.
pub fn sys_ble_read(data: &mut [u8]) -> usize {
    let [p, l] = Arg::buf_mut(data);
    syscall(Sysnum::BleRead, &[p, l]).as_u32() as usize
}
