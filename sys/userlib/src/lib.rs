// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Application support library.
//!
//! This contains the syscall stubs, and re-exports the contents of the `abi`
//! crate that gets shared with the kernel.
//!
//! # Syscall stub implementations
//!
//! Each stub is a typed `sys_*` function. It describes its arguments as
//! [`Arg`](abi::wire::Arg)s, and [`syscall`] lowers them into registers using
//! the call's entry in the shared descriptor table, traps, and raises the
//! result back to the width the table promises. No stub shifts or masks
//! registers by hand, so the layout can't drift from what the kernel
//! expects.
//!
//! Stubs that pass a buffer pass its real length; the kernel refuses any
//! range the task doesn't own, and ends the task for asking. Stubs that
//! receive a structure give the kernel a local to fill and return it by
//! value.
//!
//! Stubs for calls that never return (`sys_exit*`, `sys_reboot*`) spin if
//! the trap comes back anyway.

#![cfg_attr(target_os = "none", no_std)]

pub use abi::*;

use abi::wire::{lower, Arg, Ret};

mod arch;
mod ble;
mod display;
mod input;
mod power;
mod security;
mod storage;
mod system;
mod usb;

pub use arch::*;
pub use ble::*;
pub use display::*;
pub use input::*;
pub use power::*;
pub use security::*;
pub use storage::*;
pub use system::*;
pub use usb::*;

/// Issues syscall `nr` with `args`.
///
/// # Panics
///
/// If `args` doesn't match the descriptor for `nr`.
#[inline(always)]
pub fn syscall(nr: Sysnum, args: &[Arg]) -> Ret {
    let desc = nr.desc();
    let regs = arch::trap(nr as u32, &lower(desc, args));
    Ret::raise(desc.ret, regs)
}

/// Address of a local the kernel fills in.
fn out<T>(v: &mut T) -> Arg {
    Arg::Ptr(v as *mut T as usize)
}

/// Address of a value the kernel copies in.
fn input<T>(v: &T) -> Arg {
    Arg::Ptr(v as *const T as usize)
}

/// What to do when a call that can't return does.
fn unreachable_return() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
