// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The trap itself.
//!
//! On the device this is `svc #0`. Hosted builds have no kernel to trap
//! into, so the trap calls a handler registered with [`set_trap_handler`]
//! instead; tests use this to drive a kernel through the same stubs the
//! application uses.

use abi::wire::{RetSlots, Slots};

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_os = "none"))] {
        /// Traps into the kernel.
        ///
        /// Arguments go in `r0`-`r5` and the number in `r12`; the result
        /// comes back in `r0` and `r1`. The kernel may read or write any
        /// memory the arguments name, so this is not `nomem`.
        #[inline(always)]
        pub(crate) fn trap(nr: u32, args: &Slots) -> RetSlots {
            let r0: usize;
            let r1: usize;
            // Safety: the kernel only touches memory this task owns, and
            // only where the arguments say to.
            unsafe {
                core::arch::asm!(
                    "svc #0",
                    inout("r0") args[0] => r0,
                    inout("r1") args[1] => r1,
                    inout("r2") args[2] => _,
                    inout("r3") args[3] => _,
                    in("r4") args[4],
                    in("r5") args[5],
                    inout("r12") nr => _,
                    options(nostack),
                );
            }
            [r0, r1]
        }
    } else {
        use std::cell::Cell;

        /// Stands in for the kernel on hosted builds: gets the syscall
        /// number and argument slots, returns the result registers.
        pub type TrapHandler = fn(u32, &Slots) -> RetSlots;

        std::thread_local! {
            static HANDLER: Cell<Option<TrapHandler>> = const { Cell::new(None) };
        }

        /// Routes this thread's traps to `handler`.
        pub fn set_trap_handler(handler: TrapHandler) {
            HANDLER.with(|h| h.set(Some(handler)));
        }

        pub(crate) fn trap(nr: u32, args: &Slots) -> RetSlots {
            match HANDLER.with(Cell::get) {
                Some(handler) => handler(nr, args),
                None => panic!("syscall {nr} with no trap handler"),
            }
        }
    }
}
