// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support for interrupt handlers.
//!
//! A handler can fire while any mode is installed, including `App`, where
//! the driver state it needs may be out of reach. Handlers therefore run
//! their bodies inside [`with_default_mode`].

use crate::mpu::{MpuCell, MpuMode};

/// Runs `body` with the `Default` mode installed, then reinstalls whatever
/// mode was interrupted. Nests correctly.
pub fn with_default_mode<R>(mpu: &MpuCell, body: impl FnOnce() -> R) -> R {
    let prev = mpu.reconfigure(MpuMode::Default);
    let r = body();
    mpu.restore(prev);
    r
}
