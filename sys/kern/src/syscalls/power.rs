// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Power manager: battery state, charging events and low-power modes.
//! Optional.

use abi::wire::{Args, Ret};
use abi::{PmEvents, PmState};

use super::{present, Cx};
use crate::err::UserError;

pub(super) fn suspend(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let pm = present(cx.hw.power_manager())?;
    let out = cx.mem.out::<u32>(args.ptr(0))?;
    let mut wakeup = 0;
    let status = pm.suspend(&mut wakeup);
    out.store(wakeup);
    Ok(status.into())
}

pub(super) fn hibernate(
    cx: &mut Cx<'_>,
    _args: &Args<'_>,
) -> Result<Ret, UserError> {
    Ok(present(cx.hw.power_manager())?.hibernate().into())
}

pub(super) fn get_state(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let pm = present(cx.hw.power_manager())?;
    let out = cx.mem.out::<PmState>(args.ptr(0))?;
    let mut state = PmState::default();
    let status = pm.state(&mut state);
    out.store(state);
    Ok(status.into())
}

/// Reports whether anything happened. The events are stored either way, so
/// a quiet call leaves zero flags rather than stale ones.
pub(super) fn get_events(
    cx: &mut Cx<'_>,
    args: &Args<'_>,
) -> Result<Ret, UserError> {
    let pm = present(cx.hw.power_manager())?;
    let out = cx.mem.out::<PmEvents>(args.ptr(0))?;
    let events = pm.events();
    out.store(events.unwrap_or_default());
    Ok(events.is_some().into())
}
