// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel context and startup.
//!
//! All mutable kernel state lives in one [`Kernel`], owned by whoever built
//! it. Host tests drive a `Kernel` directly. On hardware the board's `main`
//! hands it to [`install`], after which exception handlers reach it through
//! [`with_kernel`].

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use abi::wire::Slots;
use abi::FaultInfo;

use crate::drivers::Platform;
use crate::mpu::MpuCell;
use crate::syscalls::{self, Cx, Resume};
use crate::task::Task;
use crate::umem::UserMem;

/// The kernel: the region controller, the one task, and the board.
pub struct Kernel<'a> {
    mpu: &'a MpuCell,
    task: Task,
    platform: &'a mut dyn Platform,
}

impl<'a> Kernel<'a> {
    /// Builds a kernel around an already initialized region controller, with
    /// a freshly started task.
    pub fn new(mpu: &'a MpuCell, platform: &'a mut dyn Platform) -> Self {
        Self {
            mpu,
            task: Task::new(),
            platform,
        }
    }

    /// The single unprivileged task.
    pub fn active_task(&self) -> &Task {
        &self.task
    }

    pub fn active_task_mut(&mut self) -> &mut Task {
        &mut self.task
    }

    pub fn mpu(&self) -> &'a MpuCell {
        self.mpu
    }

    pub fn platform(&mut self) -> &mut dyn Platform {
        &mut *self.platform
    }

    /// Checks whether the task may read all of `[ptr, ptr + len)`.
    pub fn probe_read_access(&self, ptr: usize, len: usize) -> bool {
        self.mpu.can_read(ptr, len)
    }

    /// Checks whether the task may write all of `[ptr, ptr + len)`.
    pub fn probe_write_access(&self, ptr: usize, len: usize) -> bool {
        self.mpu.can_write(ptr, len)
    }

    /// Handles one trap from the task.
    pub fn syscall(&mut self, nr: u32, slots: &Slots) -> Resume {
        syscalls::syscall_entry(&mut self.cx(), nr, slots)
    }

    /// Ends the task for a fault the processor caught.
    pub fn fault_task(&mut self, fault: FaultInfo) {
        let mut cx = self.cx();
        let t = cx.task.access_violation(fault);
        let _ = cx.finish(t);
    }

    pub(crate) fn cx(&mut self) -> Cx<'_> {
        Cx {
            mem: UserMem::new(self.mpu),
            task: &mut self.task,
            hw: &mut *self.platform,
        }
    }
}

/// Tracks when a mutable reference to the installed kernel is floating
/// around, to prevent production of a second one. A sort of ad-hoc Mutex.
static KERNEL_IN_USE: AtomicBool = AtomicBool::new(false);

struct KernelSlot(UnsafeCell<Option<Kernel<'static>>>);

// Safety: every access goes through `with_slot`, which refuses to hand out a
// second reference while one is live.
unsafe impl Sync for KernelSlot {}

static KERNEL: KernelSlot = KernelSlot(UnsafeCell::new(None));

/// Makes `kernel` the one that exception handlers see, and turns on the
/// faults that let the kernel blame the task for bad accesses.
///
/// A kernel already installed is replaced, and dropped.
pub fn install(kernel: Kernel<'static>) {
    with_slot(|slot| *slot = Some(kernel));
    crate::arch::enable_faults();
}

/// Removes the installed kernel and hands it back.
pub fn teardown() -> Option<Kernel<'static>> {
    with_slot(Option::take)
}

/// Runs `body` against the installed kernel, or returns `None` if there is
/// none.
///
/// # Panics
///
/// If called re-entrantly, e.g. from an interrupt handler that preempted a
/// syscall. Handlers that need kernel state must not nest.
pub fn with_kernel<R>(
    body: impl FnOnce(&mut Kernel<'static>) -> R,
) -> Option<R> {
    with_slot(|slot| slot.as_mut().map(body))
}

fn with_slot<R>(
    body: impl FnOnce(&mut Option<Kernel<'static>>) -> R,
) -> R {
    if KERNEL_IN_USE.swap(true, Ordering::Acquire) {
        panic!("recursive use of the kernel context");
    }
    // Safety: we have asserted that no other reference exists, and the flag
    // stays set until ours is gone.
    let r = body(unsafe { &mut *KERNEL.0.get() });
    KERNEL_IN_USE.store(false, Ordering::Release);
    r
}
