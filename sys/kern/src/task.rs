// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task control.
//!
//! There is exactly one unprivileged task. It runs until it leaves through
//! one of the exits below, after which it is never resumed. Every exit path
//! hands back a [`Terminated`] token; the syscall dispatcher insists on
//! receiving one, which is how a verifier proves it ended the task rather
//! than forgetting to return a value.

use abi::{FaultInfo, UsageError, EXIT_TEXT_CAPACITY};
use arrayvec::ArrayVec;

/// A bounded, NUL-free copy of caller text.
pub type Text = ArrayVec<u8, EXIT_TEXT_CAPACITY>;

/// Copies at most `EXIT_TEXT_CAPACITY - 1` bytes of `src`, stopping early at
/// the first NUL.
pub fn bounded_text(src: &[u8]) -> Text {
    let limit = src.len().min(EXIT_TEXT_CAPACITY - 1);
    src[..limit].iter().copied().take_while(|&b| b != 0).collect()
}

/// How the task ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// Normal exit with a status code.
    Exit { code: i32 },
    /// The task reported an error to show the user.
    Error {
        title: Text,
        message: Text,
        footer: Text,
    },
    /// The task failed an internal check, or the kernel ended it.
    Fatal { message: Text, file: Text, line: i32 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    Running,
    Terminated(Termination),
}

/// Proof that the task has been terminated.
///
/// Only this module can make one, and every exit path does.
#[must_use = "a termination must be handed back to the syscall dispatcher"]
#[derive(Debug, Eq, PartialEq)]
pub struct Terminated(());

/// The running unprivileged task.
#[derive(Debug)]
pub struct Task {
    state: TaskState,
    fault: Option<FaultInfo>,
    reported: bool,
}

impl Default for Task {
    fn default() -> Self {
        Self::new()
    }
}

impl Task {
    pub const fn new() -> Self {
        Self {
            state: TaskState::Running,
            fault: None,
            reported: false,
        }
    }

    pub fn state(&self) -> &TaskState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TaskState::Running
    }

    pub fn termination(&self) -> Option<&Termination> {
        match &self.state {
            TaskState::Running => None,
            TaskState::Terminated(t) => Some(t),
        }
    }

    /// The fault that ended the task, if one did.
    pub fn fault(&self) -> Option<FaultInfo> {
        self.fault
    }

    pub fn exit(&mut self, code: i32) -> Terminated {
        self.terminate(Termination::Exit { code })
    }

    pub fn exit_error(
        &mut self,
        title: &[u8],
        message: &[u8],
        footer: &[u8],
    ) -> Terminated {
        self.terminate(Termination::Error {
            title: bounded_text(title),
            message: bounded_text(message),
            footer: bounded_text(footer),
        })
    }

    pub fn exit_fatal(
        &mut self,
        message: &[u8],
        file: &[u8],
        line: i32,
    ) -> Terminated {
        self.terminate(Termination::Fatal {
            message: bounded_text(message),
            file: bounded_text(file),
            line,
        })
    }

    /// Ends the task for misusing the kernel.
    pub fn access_violation(&mut self, fault: FaultInfo) -> Terminated {
        if self.is_running() {
            self.fault = Some(fault);
        }
        let message: &[u8] = match fault {
            FaultInfo::SyscallUsage(UsageError::BadSyscallNumber) => {
                b"invalid syscall"
            }
            _ => b"access violation",
        };
        self.exit_fatal(message, file!().as_bytes(), line!() as i32)
    }

    /// Hands out the termination exactly once, so the platform hears about
    /// it a single time however many paths lead here.
    pub(crate) fn take_report(&mut self) -> Option<&Termination> {
        if self.reported || self.is_running() {
            return None;
        }
        self.reported = true;
        self.termination()
    }

    fn terminate(&mut self, how: Termination) -> Terminated {
        // The first way out is the one that counts.
        if self.is_running() {
            self.state = TaskState::Terminated(how);
        }
        Terminated(())
    }
}
