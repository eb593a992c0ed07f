// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Descriptor types, used to statically describe the board's memory.

use kerncore::Span;

/// Hardware region granularity. Every base and size handed to the MPU is a
/// multiple of this.
pub const REGION_ALIGN: usize = 32;

/// A contiguous physical area.
///
/// An area with `size == 0` or `start == 0` is *absent*: it is never mapped
/// and never probes as accessible.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Area {
    pub start: usize,
    pub size: usize,
}

impl Area {
    /// The absent area.
    pub const NONE: Self = Self { start: 0, size: 0 };

    pub const fn new(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    pub const fn is_present(&self) -> bool {
        self.start != 0 && self.size != 0
    }

    /// Checks that both ends fall on the region granularity.
    pub const fn is_aligned(&self) -> bool {
        self.start % REGION_ALIGN == 0 && self.size % REGION_ALIGN == 0
    }

    /// Checks that the size is a power of two, at least the granularity, and
    /// that the area starts on a multiple of its own size. ARMv7-M can only
    /// map areas of this shape.
    pub const fn is_natural(&self) -> bool {
        self.size.is_power_of_two()
            && self.size >= REGION_ALIGN
            && self.start % self.size == 0
    }

    /// The address range covered, or `None` if the area is absent or would
    /// wrap the address space.
    pub fn span(&self) -> Option<Span> {
        if self.is_present() {
            Span::from_base_size(self.start, self.size)
        } else {
            None
        }
    }
}

/// Memory of the currently loaded applet.
///
/// Two read/write data areas and two read-only code areas. Any of them may be
/// absent.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct AppletLayout {
    pub data1: Area,
    pub data2: Area,
    pub code1: Area,
    pub code2: Area,
}

impl AppletLayout {
    pub const EMPTY: Self = Self {
        data1: Area::NONE,
        data2: Area::NONE,
        code1: Area::NONE,
        code2: Area::NONE,
    };
}

/// Fixed physical layout of the board, generated from `memory.toml` at build
/// time.
#[derive(Copy, Clone, Debug)]
pub struct MemoryMap {
    pub kernel_flash: Area,
    pub kernel_ram: Area,
    pub peripherals: Area,
    pub boardcaps: Area,
    pub bootloader: Area,
    pub bootargs: Area,
    pub otp: Area,
    pub flash_ob: Area,
    pub secret: Area,
    pub storage1: Area,
    pub storage2: Area,
    pub assets: Area,
    pub unused_flash: Area,
    pub saes: Area,
}

include!(concat!(env!("OUT_DIR"), "/memory_map.rs"));

/// Description of one programmed region.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegionDesc {
    /// Address of start of region. Must be a multiple of [`REGION_ALIGN`],
    /// and on ARMv7-M also naturally aligned for the size.
    pub base: usize,
    /// Size of region, in bytes. On ARMv7-M this must be a power of two.
    pub size: usize,
    /// Flags describing what can be done with this region.
    pub attributes: RegionAttributes,
}

impl RegionDesc {
    pub fn end_addr(&self) -> usize {
        self.base.wrapping_add(self.size)
    }

    pub fn span(&self) -> Span {
        Span {
            base: self.base,
            end: self.end_addr(),
        }
    }
}

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct RegionAttributes: u32 {
        /// Region can be read.
        const READ = 1 << 0;
        /// Region can be written.
        const WRITE = 1 << 1;
        /// Region can contain executable code.
        const EXECUTE = 1 << 2;
        /// Region contains memory mapped registers. This affects cache
        /// behavior and discourages the kernel from using `memcpy` in the
        /// region.
        const DEVICE = 1 << 3;
        /// Region is shared with a DMA engine and must not be cached.
        ///
        /// This is ignored for `DEVICE` memory, which is already not cached.
        const DMA = 1 << 4;
        /// Region is reachable from unprivileged code. Without this, the
        /// access bits apply to the kernel only.
        const USER = 1 << 5;
    }
}
