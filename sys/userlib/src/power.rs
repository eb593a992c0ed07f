// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use abi::{PmEvents, PmState, PmStatus, Sysnum};

use crate::{out, syscall};

/// Suspends the device. Returns the status and the wakeup sources that
/// ended the suspend.
pub fn sys_pm_suspend() -> (PmStatus, u32) {
    let mut wakeup = 0u32;
    let r = syscall(Sysnum::PmSuspend, &[out(&mut wakeup)]);
    (r.as_pm_status(), wakeup)
}

pub fn sys_pm_hibernate() -> PmStatus {
    syscall(Sysnum::PmHibernate, &[]).as_pm_status()
}

pub fn sys_pm_get_state() -> Result<PmState, PmStatus> {
    let mut state = PmState::default();
    let status = syscall(Sysnum::PmGetState, &[out(&mut state)]).as_pm_status();
    if status.is_ok() {
        Ok(state)
    } else {
        Err(status)
    }
}

pub fn sys_pm_get_events() -> Option<PmEvents> {
    let mut events = PmEvents::default();
    syscall(Sysnum::PmGetEvents, &[out(&mut events)])
        .as_bool()
        .then_some(events)
}
