// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::wire::Arg;
use abi::{Sysnum, UsbClassInfo, UsbDevInfo, UsbState};

use crate::{input, out, syscall};

/// The USB class a call is aimed at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbClass {
    Hid,
    Vcp,
    WebUsb,
}

/// Classes that support waiting on all their interfaces at once.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbSelectClass {
    Hid,
    WebUsb,
}

struct ClassCalls {
    add: Sysnum,
    can_read: Sysnum,
    can_write: Sysnum,
    read: Sysnum,
    write: Sysnum,
    read_blocking: Sysnum,
    write_blocking: Sysnum,
}

impl UsbClass {
    fn calls(self) -> ClassCalls {
        match self {
            UsbClass::Hid => ClassCalls {
                add: Sysnum::UsbHidAdd,
                can_read: Sysnum::UsbHidCanRead,
                can_write: Sysnum::UsbHidCanWrite,
                read: Sysnum::UsbHidRead,
                write: Sysnum::UsbHidWrite,
                read_blocking: Sysnum::UsbHidReadBlocking,
                write_blocking: Sysnum::UsbHidWriteBlocking,
            },
            UsbClass::Vcp => ClassCalls {
                add: Sysnum::UsbVcpAdd,
                can_read: Sysnum::UsbVcpCanRead,
                can_write: Sysnum::UsbVcpCanWrite,
                read: Sysnum::UsbVcpRead,
                write: Sysnum::UsbVcpWrite,
                read_blocking: Sysnum::UsbVcpReadBlocking,
                write_blocking: Sysnum::UsbVcpWriteBlocking,
            },
            UsbClass::WebUsb => ClassCalls {
                add: Sysnum::UsbWebUsbAdd,
                can_read: Sysnum::UsbWebUsbCanRead,
                can_write: Sysnum::UsbWebUsbCanWrite,
                read: Sysnum::UsbWebUsbRead,
                write: Sysnum::UsbWebUsbWrite,
                read_blocking: Sysnum::UsbWebUsbReadBlocking,
                write_blocking: Sysnum::UsbWebUsbWriteBlocking,
            },
        }
    }
}

pub fn sys_usb_init(info: &UsbDevInfo) -> bool {
    syscall(Sysnum::UsbInit, &[input(info)]).as_bool()
}

pub fn sys_usb_deinit() {
    syscall(Sysnum::UsbDeinit, &[]);
}

pub fn sys_usb_start() -> bool {
    syscall(Sysnum::UsbStart, &[]).as_bool()
}

pub fn sys_usb_stop() {
    syscall(Sysnum::UsbStop, &[]);
}

pub fn sys_usb_get_event() -> u32 {
    syscall(Sysnum::UsbGetEvent, &[]).as_u32()
}

pub fn sys_usb_get_state() -> UsbState {
    let mut state = UsbState::default();
    syscall(Sysnum::UsbGetState, &[out(&mut state)]);
    state
}

pub fn sys_usb_class_add(class: UsbClass, info: &UsbClassInfo) -> bool {
    syscall(class.calls().add, &[input(info)]).as_bool()
}

pub fn sys_usb_can_read(class: UsbClass, iface: u8) -> bool {
    syscall(class.calls().can_read, &[Arg::U32(iface.into())]).as_bool()
}

pub fn sys_usb_can_write(class: UsbClass, iface: u8) -> bool {
    syscall(class.calls().can_write, &[Arg::U32(iface.into())]).as_bool()
}

/// Reads a packet into `buf`. Returns the byte count, or a negative value.
pub fn sys_usb_read(class: UsbClass, iface: u8, buf: &mut [u8]) -> i32 {
    let [p, l] = Arg::buf_mut(buf);
    syscall(class.calls().read, &[Arg::U32(iface.into()), p, l]).as_i32()
}

pub fn sys_usb_write(class: UsbClass, iface: u8, buf: &[u8]) -> i32 {
    let [p, l] = Arg::buf(buf);
    syscall(class.calls().write, &[Arg::U32(iface.into()), p, l]).as_i32()
}

/// Waits up to `timeout` ms for any interface of `class` to have data, and
/// returns its number, or a negative value.
pub fn sys_usb_read_select(class: UsbSelectClass, timeout: u32) -> i32 {
    let nr = match class {
        UsbSelectClass::Hid => Sysnum::UsbHidReadSelect,
        UsbSelectClass::WebUsb => Sysnum::UsbWebUsbReadSelect,
    };
    syscall(nr, &[Arg::U32(timeout)]).as_i32()
}

pub fn sys_usb_read_blocking(
    class: UsbClass,
    iface: u8,
    buf: &mut [u8],
    timeout: i32,
) -> i32 {
    let [p, l] = Arg::buf_mut(buf);
    syscall(
        class.calls().read_blocking,
        &[Arg::U32(iface.into()), p, l, Arg::I32(timeout)],
    )
    .as_i32()
}

pub fn sys_usb_write_blocking(
    class: UsbClass,
    iface: u8,
    buf: &[u8],
    timeout: i32,
) -> i32 {
    let [p, l] = Arg::buf(buf);
    syscall(
        class.calls().write_blocking,
        &[Arg::U32(iface.into()), p, l, Arg::I32(timeout)],
    )
    .as_i32()
}
