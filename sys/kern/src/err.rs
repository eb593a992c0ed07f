// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common error-handling support.
//!
//! Syscall verifiers are written as `Result` pipelines. Anything that goes
//! wrong on the caller's side surfaces as a [`UserError`], and the dispatcher
//! is the one place that turns it into a task termination.

use abi::{FaultInfo, FaultSource, UsageError};

use crate::task::Terminated;

/// Why a syscall did not produce a result.
#[derive(Debug)]
pub enum UserError {
    /// The caller handed the kernel something it must not touch, or
    /// arguments that make no sense. Always fatal to the task.
    Violation(FaultInfo),
    /// The task ended itself (exit, error exit, fatal exit). The token
    /// proves the task state has already been updated.
    Terminated(Terminated),
}

impl UserError {
    /// A failed probe of caller memory at `address`.
    pub fn access(address: usize) -> Self {
        Self::Violation(FaultInfo::MemoryAccess {
            address: Some(address),
            source: FaultSource::Kernel,
        })
    }
}

impl From<FaultInfo> for UserError {
    fn from(f: FaultInfo) -> Self {
        Self::Violation(f)
    }
}

/// Convenience conversion from `UsageError` (by way of `FaultInfo`).
impl From<UsageError> for UserError {
    fn from(e: UsageError) -> Self {
        Self::Violation(e.into())
    }
}

impl From<Terminated> for UserError {
    fn from(t: Terminated) -> Self {
        Self::Terminated(t)
    }
}
