// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture support for ARMv7-M and ARMv8-M.
//!
//! # Syscall convention
//!
//! A task issues `svc #0` with up to six argument words in `r0` through `r5`
//! and the syscall number in `r12`. Results come back in `r0`, and in `r1`
//! for 64-bit values.
//!
//! On exception entry the hardware stacks `r0`-`r3` and `r12` (among others)
//! on the task's stack, so the handler finds five of the seven inputs in the
//! exception frame. `r4` and `r5` are callee-saved and are still live when
//! `SVCall` starts, so the assembly passes them to `svc_dispatch` directly.
//! Results are written back into the stacked `r0`/`r1`, which the hardware
//! restores on exception return.
//!
//! # MPU
//!
//! Region tables are loaded with the MPU *off*. A region spans several
//! registers, and there is no order in which they can be updated with the
//! MPU on that never exposes a mix of old and new settings. The caller also
//! holds interrupts off (see `MpuCell`), so no handler runs against a
//! partial table either. `PRIVDEFENA` stays set, so privileged code keeps the
//! default map for anything not covered by a region.

use core::arch::global_asm;

use abi::wire::Slots;
use abi::{FaultInfo, FaultSource};
use cortex_m::peripheral::mpu::RegisterBlock;

use crate::descs::{Area, RegionAttributes, RegionDesc, REGION_ALIGN};
use crate::startup;
use crate::syscalls::Resume;

cfg_if::cfg_if! {
    if #[cfg(not(any(armv7m, armv8m)))] {
        compile_error!("this kernel needs an ARMv7-M or ARMv8-M MPU");
    }
}

macro_rules! uassert {
    ($cond:expr) => {
        if !$cond {
            panic!("Assertion failed!");
        }
    };
}

cfg_if::cfg_if! {
    if #[cfg(feature = "klog-semihosting")] {
        macro_rules! klog {
            ($($tt:tt)*) => {
                cortex_m_semihosting::hprintln!($($tt)*)
            };
        }
    } else if #[cfg(feature = "klog-itm")] {
        macro_rules! klog {
            ($($tt:tt)*) => {{
                // Safety: the kernel is the only writer of stimulus port 0.
                let stim = unsafe {
                    &mut (*cortex_m::peripheral::ITM::PTR.cast_mut()).stim[0]
                };
                cortex_m::iprintln!(stim, $($tt)*);
            }};
        }
    } else {
        macro_rules! klog {
            ($($tt:tt)*) => {{
                if false {
                    let _ = core::format_args!($($tt)*);
                }
            }};
        }
    }
}

/// Handle on the memory protection unit.
pub struct MpuHardware(());

impl MpuHardware {
    pub fn new() -> Self {
        Self(())
    }

    /// Replaces the whole region table. Slots past the end of `regions` are
    /// cleared. The MPU is left off unless `enable` is set.
    pub fn apply_regions(&mut self, enable: bool, regions: &[RegionDesc]) {
        // We are manufacturing authority to interact with the MPU here, since
        // the only handle we have is this zero-sized token.
        //
        // Safety: shared reference to a register block; all accesses go
        // through volatile cells.
        let mpu = unsafe { &*cortex_m::peripheral::MPU::PTR };
        let available = ((mpu._type.read() >> 8) & 0xFF) as usize;
        uassert!(regions.len() <= available);

        // Safety: turning the MPU off only widens what privileged code may
        // touch, and we're privileged code with interrupts masked.
        unsafe {
            disable_mpu(mpu);
        }

        // Safety: the MPU is off, so attribute changes can't race.
        unsafe {
            load_attributes(mpu);
        }

        for i in 0..available {
            // Safety: the MPU is off; each slot is selected and then written
            // in full before moving to the next.
            unsafe {
                mpu.rnr.write(i as u32);
                match regions.get(i) {
                    Some(r) => program_region(mpu, r),
                    None => clear_region(mpu),
                }
            }
        }

        if enable {
            // Safety: the table is complete.
            unsafe {
                enable_mpu(mpu);
            }
        }
    }
}

impl MpuHardware {
    /// Checks that `area` can be programmed as exactly one region.
    pub fn can_encode(&self, area: &Area) -> bool {
        encodable(area)
    }
}

/// ARMv7-M regions are naturally aligned powers of two.
#[cfg(armv7m)]
fn encodable(area: &Area) -> bool {
    area.is_aligned() && area.is_natural()
}

/// ARMv8-M regions are any granule-aligned base and limit.
#[cfg(armv8m)]
fn encodable(area: &Area) -> bool {
    area.is_aligned()
}

/// Access-permission bits. Regions without `USER` are closed to tasks
/// entirely; regions with it are shared with privileged code on the same
/// terms.
#[cfg(armv7m)]
fn access_bits(ratts: RegionAttributes) -> u32 {
    let user = ratts.contains(RegionAttributes::USER);
    let write = ratts.contains(RegionAttributes::WRITE);
    match (user, write) {
        (true, true) => 0b011,
        (true, false) => 0b110,
        (false, true) => 0b001,
        (false, false) => 0b101,
    }
}

#[cfg(armv7m)]
unsafe fn program_region(mpu: &RegisterBlock, r: &RegionDesc) {
    let base = r.base as u32;
    let size = r.size as u32;
    // ARMv7-M regions are naturally aligned powers of two.
    uassert!(size.is_power_of_two());
    uassert!(size as usize >= REGION_ALIGN);
    uassert!(base & (size - 1) == 0);

    let ratts = r.attributes;
    let xn = !ratts.contains(RegionAttributes::EXECUTE);
    // TEX/SCB per table B3-13 of the ARMv7-M ARM.
    let (tex, scb) = if ratts.contains(RegionAttributes::DEVICE) {
        // Shareable device.
        (0b000, 0b101)
    } else if ratts.contains(RegionAttributes::DMA) {
        // Normal, non-cacheable, shareable.
        (0b001, 0b100)
    } else {
        // Normal, write-back, read and write allocate, not shared.
        (0b001, 0b011)
    };
    // The SIZE field holds log2(size) - 1.
    let l2size = size.trailing_zeros() - 1;
    let rasr = (xn as u32) << 28
        | access_bits(ratts) << 24
        | tex << 19
        | scb << 16
        | l2size << 1
        | 1;

    unsafe {
        // VALID clear: the region number comes from RNR.
        mpu.rbar.write(base);
        mpu.rasr.write(rasr);
    }
}

#[cfg(armv7m)]
unsafe fn load_attributes(_mpu: &RegisterBlock) {
    // Memory types live in each RASR on this profile.
}

#[cfg(armv7m)]
unsafe fn clear_region(mpu: &RegisterBlock) {
    unsafe {
        mpu.rasr.write(0);
        mpu.rbar.write(0);
    }
}

/// Memory attribute palette loaded into MAIR0.
///
/// - 0: device, nGnRnE
/// - 1: normal, inner and outer non-cacheable
/// - 2: normal, inner and outer write-back, read and write allocate
#[cfg(armv8m)]
const MAIR0: u32 = 0x00 | 0x44 << 8 | 0xFF << 16;

#[cfg(armv8m)]
unsafe fn load_attributes(mpu: &RegisterBlock) {
    unsafe {
        mpu.mair[0].write(MAIR0);
    }
}

#[cfg(armv8m)]
fn access_bits(ratts: RegionAttributes) -> u32 {
    let user = ratts.contains(RegionAttributes::USER);
    let write = ratts.contains(RegionAttributes::WRITE);
    match (user, write) {
        (false, true) => 0b00,
        (true, true) => 0b01,
        (false, false) => 0b10,
        (true, false) => 0b11,
    }
}

#[cfg(armv8m)]
unsafe fn program_region(mpu: &RegisterBlock, r: &RegionDesc) {
    let base = r.base as u32;
    let size = r.size as u32;
    // This MPU stuffs extra fields into the bottom five bits of both
    // address registers.
    uassert!(base as usize % REGION_ALIGN == 0);
    uassert!(size as usize % REGION_ALIGN == 0 && size != 0);

    let ratts = r.attributes;
    let xn = !ratts.contains(RegionAttributes::EXECUTE);
    let (attr, sh) = if ratts.contains(RegionAttributes::DEVICE) {
        (0, 0b10)
    } else if ratts.contains(RegionAttributes::DMA) {
        (1, 0b10)
    } else {
        (2, 0b00)
    };
    let rbar = base | sh << 3 | access_bits(ratts) << 1 | xn as u32;
    // Upper bound is the address of the last 32-byte block. A region that
    // ends at the top of the address space wraps back around correctly.
    let limit = base.wrapping_add(size).wrapping_sub(REGION_ALIGN as u32);
    let rlar = limit | attr << 1 | 1;

    unsafe {
        mpu.rbar.write(rbar);
        mpu.rlar.write(rlar);
    }
}

#[cfg(armv8m)]
unsafe fn clear_region(mpu: &RegisterBlock) {
    unsafe {
        mpu.rlar.write(0);
        mpu.rbar.write(0);
    }
}

unsafe fn disable_mpu(mpu: &RegisterBlock) {
    // Let any outstanding accesses finish under the old table.
    cortex_m::asm::dmb();
    unsafe {
        mpu.ctrl.write(0);
    }
}

unsafe fn enable_mpu(mpu: &RegisterBlock) {
    const ENABLE: u32 = 0b001;
    const PRIVDEFENA: u32 = 0b100;
    unsafe {
        mpu.ctrl.write(ENABLE | PRIVDEFENA);
    }
    // The new table must be in force before the next instruction fetch.
    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

/// Turns on the MemManage fault so task memory faults don't escalate to
/// HardFault, and puts SVCall below it.
pub fn enable_faults() {
    // Safety: we're only lowering priorities and enabling a fault that
    // already has a handler below.
    unsafe {
        let scb = &*cortex_m::peripheral::SCB::PTR;
        scb.shcsr.modify(|x| x | 1 << 16);
        // MemManage at the highest configurable priority.
        scb.shpr[0].write(0x00);
        // SVCall at the lowest.
        scb.shpr[7].write(0xFF);
    }
}

global_asm! {"
    .section .text.SVCall
    .globl SVCall
    .type SVCall,function
    .thumb_func
    SVCall:
        @ Find the exception frame. Tasks run on PSP; a trap from kernel
        @ thread mode stacks onto MSP.
        tst lr, #4
        ite eq
        mrseq r0, MSP
        mrsne r0, PSP
        @ r4 and r5 still hold the fifth and sixth arguments. r6 is pushed
        @ only to keep the stack 8-byte aligned.
        push {{r4, r5, r6, lr}}
        mov r1, r4
        mov r2, r5
        bl svc_dispatch
        pop {{r4, r5, r6, pc}}
"}

/// Rust half of `SVCall`.
///
/// # Safety
///
/// Only `SVCall` may call this, with `frame` pointing at the exception frame
/// the hardware stacked on entry.
#[no_mangle]
unsafe extern "C" fn svc_dispatch(frame: *mut u32, arg4: u32, arg5: u32) {
    // Safety: the frame holds r0, r1, r2, r3, r12 in its first five words,
    // per our contract.
    let (nr, slots): (u32, Slots) = unsafe {
        (
            frame.add(4).read(),
            [
                frame.read() as usize,
                frame.add(1).read() as usize,
                frame.add(2).read() as usize,
                frame.add(3).read() as usize,
                arg4 as usize,
                arg5 as usize,
            ],
        )
    };

    match startup::with_kernel(|k| k.syscall(nr, &slots)) {
        Some(Resume::Return(ret)) => {
            // Safety: same frame, same contract.
            unsafe {
                frame.write(ret[0] as u32);
                frame.add(1).write(ret[1] as u32);
            }
        }
        Some(Resume::Terminated) => idle(),
        None => panic!("syscall with no kernel installed"),
    }
}

global_asm! {"
    .section .text.MemoryManagement
    .globl MemoryManagement
    .type MemoryManagement,function
    .thumb_func
    MemoryManagement:
        mov r0, lr
        bl mem_fault_entry
"}

/// Rust half of the MemManage handler. Blames the task if the fault came
/// from thread mode; a fault inside the kernel is a kernel bug.
#[no_mangle]
extern "C" fn mem_fault_entry(exc_return: u32) -> ! {
    const MMARVALID: u32 = 1 << 7;

    // Safety: shared reference to a register block.
    let scb = unsafe { &*cortex_m::peripheral::SCB::PTR };
    let cfsr = scb.cfsr.read();
    if exc_return & 0b1000 == 0 {
        panic!("kernel memory fault: CFSR={:#010x}", cfsr);
    }

    let address = if cfsr & MMARVALID != 0 {
        Some(scb.mmfar.read() as usize)
    } else {
        None
    };
    // Safety: write-one-to-clear of the MemManage status bits only.
    unsafe {
        scb.cfsr.write(cfsr & 0xFF);
    }

    startup::with_kernel(|k| {
        k.fault_task(FaultInfo::MemoryAccess {
            address,
            source: FaultSource::User,
        })
    });
    idle()
}

/// Parks the processor once there's no task left to run.
pub fn idle() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}
