// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Security-boundary kernel.
//!
//! This is the privileged half of a two-level firmware: one unprivileged
//! task (the application, or an applet it loads) runs on top, and every
//! service it needs from the hardware goes through a syscall handled here.
//!
//! # Design principles
//!
//! 1. The task is untrusted. Every pointer it passes is checked against the
//!    memory it owns before the kernel touches it, and anything structured is
//!    copied into kernel memory first.
//! 2. Failure is terminal. A task that misuses the interface is ended, once,
//!    and never resumed.
//! 3. Static configuration. The board's memory map is fixed at build time
//!    and memory protection is computed from it, not discovered.
//! 4. A strong preference for safe code where reasonable. The `unsafe` that
//!    remains sits at the hardware edges (`arch`) and in `umem`.
//!
//! Code outside `arch` is portable and is tested on the host, against the
//! `fake` architecture.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
pub mod arch;

pub mod descs;
pub mod drivers;
pub mod err;
#[cfg(target_os = "none")]
pub mod fail;
pub mod irq;
pub mod mpu;
pub mod startup;
pub mod syscalls;
pub mod task;
pub mod umem;
