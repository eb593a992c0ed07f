// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-in for the MPU on hosted builds.

use arrayvec::ArrayVec;

use crate::descs::{Area, RegionDesc};
use crate::mpu::MAX_REGIONS;

macro_rules! uassert {
    ($cond:expr) => {
        assert!($cond)
    };
}

macro_rules! klog {
    ($($tt:tt)*) => {
        eprintln!($($tt)*)
    };
}

/// Remembers the last region table it was given.
///
/// By default it accepts any granule-aligned region, as ARMv8-M does. With
/// [`set_natural_only`](Self::set_natural_only) it holds regions to the
/// ARMv7-M rules instead.
#[derive(Debug, Default)]
pub struct MpuHardware {
    natural_only: bool,
    enabled: bool,
    regions: ArrayVec<RegionDesc, MAX_REGIONS>,
    programmed: usize,
}

impl MpuHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_natural_only(&mut self, on: bool) {
        self.natural_only = on;
    }

    pub fn can_encode(&self, area: &Area) -> bool {
        area.is_aligned() && (!self.natural_only || area.is_natural())
    }

    pub fn apply_regions(&mut self, enable: bool, regions: &[RegionDesc]) {
        uassert!(regions.len() <= MAX_REGIONS);
        for r in regions {
            uassert!(self.can_encode(&Area::new(r.base, r.size)));
        }
        self.enabled = false;
        self.regions.clear();
        self.regions.extend(regions.iter().copied());
        self.enabled = enable;
        self.programmed += 1;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn regions(&self) -> &[RegionDesc] {
        &self.regions
    }

    /// Number of times a table has been loaded.
    pub fn programmed(&self) -> usize {
        self.programmed
    }
}

pub fn idle() -> ! {
    panic!("idle with no task to run");
}

pub fn enable_faults() {}
