// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory protection mode state machine.
//!
//! At any instant exactly one [`MpuMode`] is installed in the hardware. Every
//! mode except `Disabled` consists of the same default regions (kernel flash,
//! kernel RAM, peripherals, and the active framebuffer) plus the grant that
//! gives the mode its name. Switching modes reprograms the whole region table
//! with interrupts masked and the MPU turned off, so nothing ever runs
//! against a half-written table.
//!
//! Region sets for all modes are computed ahead of time and kept in
//! [`Mpu::regions`]. Moving the framebuffer or loading a different applet
//! rebuilds those tables, and also the span sets used to probe syscall
//! arguments, but leaves the hardware alone; the change is picked up at the
//! next call to [`MpuCell::reconfigure`].

use core::cell::RefCell;

use arrayvec::ArrayVec;
use enum_map::EnumMap;
use kerncore::{Span, SpanSet, UserSlice};
use ringbuf::{ringbuf, ringbuf_entry};

use crate::arch::MpuHardware;
pub use crate::descs::{AppletLayout, Area};
use crate::descs::{MemoryMap, RegionAttributes, RegionDesc};

/// Capacity of a single mode's region table.
pub const MAX_REGIONS: usize = 16;

/// Named sets of accessible memory.
#[derive(Copy, Clone, Debug, Eq, PartialEq, enum_map::Enum)]
pub enum MpuMode {
    /// Protection off. Before `init` and after `deinit`.
    Disabled,
    /// Kernel memory, peripherals and the framebuffer only.
    Default,
    BoardCaps,
    Bootloader,
    BootArgs,
    Otp,
    FlashOb,
    Secret,
    Storage,
    Assets,
    UnusedFlash,
    /// The active applet's code and data, plus read access to assets.
    App,
    /// `App`, plus the SAES peripheral.
    AppSaes,
}

impl MpuMode {
    pub const ALL: [MpuMode; 13] = [
        MpuMode::Disabled,
        MpuMode::Default,
        MpuMode::BoardCaps,
        MpuMode::Bootloader,
        MpuMode::BootArgs,
        MpuMode::Otp,
        MpuMode::FlashOb,
        MpuMode::Secret,
        MpuMode::Storage,
        MpuMode::Assets,
        MpuMode::UnusedFlash,
        MpuMode::App,
        MpuMode::AppSaes,
    ];
}

/// A position in a mode's region table, resolved against the memory map and
/// the current applet when the tables are built.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Slot {
    KernelFlash,
    KernelRam,
    Peripherals,
    Framebuffer,
    BoardCaps,
    Bootloader,
    BootArgs,
    Otp,
    FlashOb,
    Secret,
    Storage1,
    Storage2,
    Assets,
    UnusedFlash,
    AppData1,
    AppData2,
    AppCode1,
    AppCode2,
    AppAssets,
    Saes,
}

/// Regions present in every mode but `Disabled`.
const DEFAULT_SLOTS: &[Slot] = &[
    Slot::KernelFlash,
    Slot::KernelRam,
    Slot::Peripherals,
    Slot::Framebuffer,
];

const APP_SLOTS: &[Slot] = &[
    Slot::AppData1,
    Slot::AppData2,
    Slot::AppCode1,
    Slot::AppCode2,
    Slot::AppAssets,
];

const APP_SAES_SLOTS: &[Slot] = &[
    Slot::AppData1,
    Slot::AppData2,
    Slot::AppCode1,
    Slot::AppCode2,
    Slot::AppAssets,
    Slot::Saes,
];

/// Extra regions a mode adds on top of [`DEFAULT_SLOTS`].
const fn grant(mode: MpuMode) -> &'static [Slot] {
    match mode {
        MpuMode::Disabled | MpuMode::Default => &[],
        MpuMode::BoardCaps => &[Slot::BoardCaps],
        MpuMode::Bootloader => &[Slot::Bootloader],
        MpuMode::BootArgs => &[Slot::BootArgs],
        MpuMode::Otp => &[Slot::Otp],
        MpuMode::FlashOb => &[Slot::FlashOb],
        MpuMode::Secret => &[Slot::Secret],
        MpuMode::Storage => &[Slot::Storage1, Slot::Storage2],
        MpuMode::Assets => &[Slot::Assets],
        MpuMode::UnusedFlash => &[Slot::UnusedFlash],
        MpuMode::App => APP_SLOTS,
        MpuMode::AppSaes => APP_SAES_SLOTS,
    }
}

const fn max_slots() -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < MpuMode::ALL.len() {
        let n = DEFAULT_SLOTS.len() + grant(MpuMode::ALL[i]).len();
        if n > max {
            max = n;
        }
        i += 1;
    }
    max
}

static_assertions::const_assert!(max_slots() <= MAX_REGIONS);

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Mode(MpuMode),
    FbRejected { addr: usize, size: usize },
    ProbeSetFull,
}

ringbuf!(Trace, 16, Trace::None);

/// The region controller proper. Normally reached through an [`MpuCell`].
pub struct Mpu {
    map: MemoryMap,
    mode: MpuMode,
    applet: AppletLayout,
    fb: Option<Span>,
    tables: EnumMap<MpuMode, ArrayVec<RegionDesc, MAX_REGIONS>>,
    readable: SpanSet<8>,
    writable: SpanSet<8>,
    hw: MpuHardware,
}

impl Mpu {
    /// Takes ownership of the hardware with protection off.
    pub fn new(map: MemoryMap) -> Self {
        let mut hw = MpuHardware::new();
        hw.apply_regions(false, &[]);
        let mut mpu = Self {
            map,
            mode: MpuMode::Disabled,
            applet: AppletLayout::EMPTY,
            fb: None,
            tables: EnumMap::default(),
            readable: SpanSet::new(),
            writable: SpanSet::new(),
            hw,
        };
        mpu.rebuild();
        mpu
    }

    pub fn mode(&self) -> MpuMode {
        self.mode
    }

    /// Installs `mode` in the hardware and returns the mode it replaced.
    ///
    /// The caller must hold off interrupts; [`MpuCell`] does this.
    pub fn reconfigure(&mut self, mode: MpuMode) -> MpuMode {
        let prev = self.mode;
        if mode != prev {
            ringbuf_entry!(Trace::Mode(mode));
        }
        self.hw
            .apply_regions(mode != MpuMode::Disabled, &self.tables[mode]);
        self.mode = mode;
        prev
    }

    pub fn applet(&self) -> AppletLayout {
        self.applet
    }

    pub fn set_active_applet(&mut self, layout: AppletLayout) {
        self.applet = layout;
        self.rebuild();
    }

    /// Records where the framebuffer lives. `addr == 0` removes it.
    ///
    /// A framebuffer the hardware can't map as one exact region is dropped
    /// rather than rounded.
    pub fn set_active_fb(&mut self, addr: usize, size: usize) {
        let area = Area::new(addr, size);
        self.fb = if !area.is_present() {
            None
        } else if !self.hw.can_encode(&area) {
            ringbuf_entry!(Trace::FbRejected { addr, size });
            None
        } else {
            area.span()
        };
        self.rebuild();
    }

    pub fn active_fb(&self) -> Option<Span> {
        self.fb
    }

    /// Checks that `size` bytes at `addr` lie wholly inside the active
    /// framebuffer.
    pub fn inside_active_fb(&self, addr: usize, size: usize) -> bool {
        self.fb.is_some_and(|fb| fb.contains(addr, size))
    }

    /// Checks that unprivileged code running in application mode could read
    /// all of `[addr, addr + len)`.
    pub fn can_read(&self, addr: usize, len: usize) -> bool {
        Span::from_base_size(addr, len)
            .is_some_and(|s| self.readable.can_access(s))
    }

    pub fn can_read_slice(&self, slice: impl UserSlice) -> bool {
        self.readable.can_access(slice)
    }

    /// Checks that unprivileged code running in application mode could write
    /// all of `[addr, addr + len)`.
    pub fn can_write(&self, addr: usize, len: usize) -> bool {
        Span::from_base_size(addr, len)
            .is_some_and(|s| self.writable.can_access(s))
    }

    pub fn can_write_slice(&self, slice: impl UserSlice) -> bool {
        self.writable.can_access(slice)
    }

    /// The region table that `mode` installs.
    pub fn regions(&self, mode: MpuMode) -> &[RegionDesc] {
        &self.tables[mode]
    }

    pub fn hardware(&self) -> &MpuHardware {
        &self.hw
    }

    #[cfg(test)]
    fn hardware_mut(&mut self) -> &mut MpuHardware {
        &mut self.hw
    }

    fn slot(&self, slot: Slot) -> Option<RegionDesc> {
        use RegionAttributes as A;

        let m = &self.map;
        let a = &self.applet;
        let (area, attributes) = match slot {
            Slot::KernelFlash => (m.kernel_flash, A::READ | A::EXECUTE),
            Slot::KernelRam => (m.kernel_ram, A::READ | A::WRITE),
            Slot::Peripherals => {
                (m.peripherals, A::READ | A::WRITE | A::DEVICE)
            }
            Slot::Framebuffer => {
                let fb = self.fb?;
                (
                    Area::new(fb.base, fb.size()),
                    A::READ | A::WRITE | A::DMA | A::USER,
                )
            }
            Slot::BoardCaps => (m.boardcaps, A::READ),
            Slot::Bootloader => (m.bootloader, A::READ),
            Slot::BootArgs => (m.bootargs, A::READ | A::WRITE),
            Slot::Otp => (m.otp, A::READ | A::WRITE),
            Slot::FlashOb => (m.flash_ob, A::READ | A::WRITE | A::DEVICE),
            Slot::Secret => (m.secret, A::READ | A::WRITE),
            Slot::Storage1 => (m.storage1, A::READ | A::WRITE),
            Slot::Storage2 => (m.storage2, A::READ | A::WRITE),
            Slot::Assets => (m.assets, A::READ | A::WRITE),
            Slot::UnusedFlash => (m.unused_flash, A::READ | A::WRITE),
            Slot::AppData1 => (a.data1, A::READ | A::WRITE | A::USER),
            Slot::AppData2 => (a.data2, A::READ | A::WRITE | A::USER),
            Slot::AppCode1 => (a.code1, A::READ | A::EXECUTE | A::USER),
            Slot::AppCode2 => (a.code2, A::READ | A::EXECUTE | A::USER),
            Slot::AppAssets => (m.assets, A::READ | A::USER),
            Slot::Saes => (m.saes, A::READ | A::WRITE | A::DEVICE | A::USER),
        };
        // Areas that can't be programmed exactly are left unmapped.
        if !area.is_present() || !self.hw.can_encode(&area) {
            return None;
        }
        let span = area.span()?;
        Some(RegionDesc {
            base: span.base,
            size: span.size(),
            attributes,
        })
    }

    fn rebuild(&mut self) {
        for mode in MpuMode::ALL {
            let mut table = ArrayVec::new();
            if mode != MpuMode::Disabled {
                for &slot in DEFAULT_SLOTS.iter().chain(grant(mode)) {
                    if let Some(region) = self.slot(slot) {
                        // Cannot overflow, see `max_slots`.
                        table.push(region);
                    }
                }
            }
            self.tables[mode] = table;
        }

        self.readable.clear();
        self.writable.clear();
        let mut full = false;
        for r in self.tables[MpuMode::App].iter() {
            if !r.attributes.contains(RegionAttributes::USER) {
                continue;
            }
            if r.attributes.contains(RegionAttributes::READ) {
                full |= self.readable.insert(r.span()).is_err();
            }
            if r.attributes.contains(RegionAttributes::WRITE) {
                full |= self.writable.insert(r.span()).is_err();
            }
        }
        if full {
            // Refuse every probe rather than answer from a partial set.
            ringbuf_entry!(Trace::ProbeSetFull);
            self.readable.clear();
            self.writable.clear();
        }
    }
}

/// Interrupt-safe home for the [`Mpu`].
///
/// Until [`MpuCell::init`] is called the cell is empty: the mode reads as
/// `Disabled`, mode changes do nothing, and every probe fails.
pub struct MpuCell {
    inner: critical_section::Mutex<RefCell<Option<Mpu>>>,
}

impl Default for MpuCell {
    fn default() -> Self {
        Self::new()
    }
}

impl MpuCell {
    pub const fn new() -> Self {
        Self {
            inner: critical_section::Mutex::new(RefCell::new(None)),
        }
    }

    /// Takes control of the hardware, with protection still off. Calling this
    /// again once initialized does nothing.
    pub fn init(&self, map: MemoryMap) {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow_ref_mut(cs);
            if slot.is_none() {
                *slot = Some(Mpu::new(map));
            }
        })
    }

    /// Turns protection off and forgets all state.
    pub fn deinit(&self) {
        critical_section::with(|cs| {
            if let Some(mut mpu) = self.inner.borrow_ref_mut(cs).take() {
                mpu.reconfigure(MpuMode::Disabled);
            }
        })
    }

    /// Runs `body` against the controller, or returns `None` if it hasn't
    /// been initialized. Interrupts are masked for the duration.
    pub fn with<R>(&self, body: impl FnOnce(&mut Mpu) -> R) -> Option<R> {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).as_mut().map(body)
        })
    }

    pub fn current_mode(&self) -> MpuMode {
        self.with(|mpu| mpu.mode()).unwrap_or(MpuMode::Disabled)
    }

    /// Switches to `mode`, returning the previous one so the caller can
    /// [`restore`](Self::restore) it.
    pub fn reconfigure(&self, mode: MpuMode) -> MpuMode {
        self.with(|mpu| mpu.reconfigure(mode))
            .unwrap_or(MpuMode::Disabled)
    }

    /// Closes a bracket opened by [`reconfigure`](Self::reconfigure).
    pub fn restore(&self, mode: MpuMode) {
        self.reconfigure(mode);
    }

    /// Reinstalls the current mode, picking up any framebuffer or applet
    /// change.
    pub fn refresh(&self) {
        self.with(|mpu| {
            let mode = mpu.mode();
            mpu.reconfigure(mode);
        });
    }

    pub fn set_active_applet(&self, layout: AppletLayout) {
        self.with(|mpu| mpu.set_active_applet(layout));
    }

    pub fn set_active_fb(&self, addr: usize, size: usize) {
        self.with(|mpu| mpu.set_active_fb(addr, size));
    }

    pub fn inside_active_fb(&self, addr: usize, size: usize) -> bool {
        self.with(|mpu| mpu.inside_active_fb(addr, size))
            .unwrap_or(false)
    }

    pub fn can_read(&self, addr: usize, len: usize) -> bool {
        self.with(|mpu| mpu.can_read(addr, len)).unwrap_or(false)
    }

    pub fn can_write(&self, addr: usize, len: usize) -> bool {
        self.with(|mpu| mpu.can_write(addr, len)).unwrap_or(false)
    }

    pub fn can_read_slice(&self, slice: impl UserSlice) -> bool {
        self.with(|mpu| mpu.can_read_slice(slice)).unwrap_or(false)
    }

    pub fn can_write_slice(&self, slice: impl UserSlice) -> bool {
        self.with(|mpu| mpu.can_write_slice(slice)).unwrap_or(false)
    }
}
