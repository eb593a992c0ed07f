// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces to the services the kernel forwards syscalls to.
//!
//! The kernel never talks to a peripheral itself. Each subsystem is a trait,
//! and a board provides one [`Platform`] that hands them out. Everything
//! passed in here has already been checked and, where it matters, copied
//! into kernel memory; implementations can trust their arguments.
//!
//! Failures use the conventions the task expects on the other side of the
//! boundary: `bool`, negative counts, or [`SecBool`].

use abi::{
    BleCommand, BleEvent, BleState, Bitblt, BootImage, ButtonEvent, FbInfo,
    PmEvents, PmState, PmStatus, SecBool, UnitProperties, UsbClassInfo,
    UsbDevInfo, UsbState, EXTERNAL_SALT_SIZE, HW_ENTROPY_LEN, UPGRADE_HASH_LEN,
};

use crate::task::Termination;

/// Optional per-call salt mixed into PIN stretching.
pub type Salt = Option<[u8; EXTERNAL_SALT_SIZE]>;

pub trait Systick {
    fn cycles(&mut self) -> u64;
    fn ms(&mut self) -> u32;
    fn us(&mut self) -> u64;
    fn us_to_cycles(&mut self, us: u64) -> u64;
}

pub trait SysEvents {
    /// Waits until one of `awaited` is ready or `deadline` (in milliseconds
    /// of systick time) passes, and reports what is ready.
    fn poll(&mut self, awaited: &abi::SysEvents, deadline: u32) -> abi::SysEvents;
}

pub trait Boot {
    fn reboot_device(&mut self) -> !;
    fn reboot_to_bootloader(&mut self) -> !;
    fn reboot_and_upgrade(&mut self, hash: &[u8; UPGRADE_HASH_LEN]) -> !;
    /// Checks a staged image against its header.
    fn image_check(&mut self, image: &BootImage, bytes: &[u8]) -> bool;
    fn image_replace(&mut self, image: &BootImage, bytes: &[u8]);
}

pub trait Display {
    fn set_backlight(&mut self, level: i32) -> i32;
    fn backlight(&mut self) -> i32;
    fn set_orientation(&mut self, angle: i32) -> i32;
    fn orientation(&mut self) -> i32;
    /// The frame buffer the task may draw into, if the display has one.
    fn fb_info(&mut self) -> Option<FbInfo>;
    fn wait_for_sync(&mut self);
    fn refresh(&mut self);
    fn fill(&mut self, bb: &Bitblt);
    /// Copies an RGB565 rectangle. `src` covers `src_stride * height` bytes
    /// starting at `bb.src_row`.
    fn copy_rgb565(&mut self, bb: &Bitblt, src: &[u8]);
}

pub trait Usb {
    fn init(&mut self, info: &UsbDevInfo) -> bool;
    fn deinit(&mut self);
    fn start(&mut self) -> bool;
    fn stop(&mut self);
    fn event(&mut self) -> u32;
    fn state(&mut self) -> UsbState;
}

/// Which USB class a call is aimed at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsbClassKind {
    Hid,
    Vcp,
    WebUsb,
}

/// One USB class driver. Reads and writes return a byte count, or a negative
/// value on failure.
pub trait UsbClass {
    fn add(&mut self, info: &UsbClassInfo) -> bool;
    fn can_read(&mut self, iface: u8) -> bool;
    fn can_write(&mut self, iface: u8) -> bool;
    fn read(&mut self, iface: u8, buf: &mut [u8]) -> i32;
    fn write(&mut self, iface: u8, buf: &[u8]) -> i32;
    /// Returns the first interface with data, or a negative value on
    /// timeout.
    fn read_select(&mut self, timeout: u32) -> i32;
    fn read_blocking(&mut self, iface: u8, buf: &mut [u8], timeout: i32) -> i32;
    fn write_blocking(&mut self, iface: u8, buf: &[u8], timeout: i32) -> i32;
}

pub trait SdCard {
    fn power_on(&mut self) -> bool;
    fn power_off(&mut self);
    fn is_present(&mut self) -> bool;
    /// Capacity in bytes.
    fn capacity(&mut self) -> u64;
    /// `dest` is exactly `count` blocks long.
    fn read_blocks(&mut self, dest: &mut [u8], block: u32, count: u32) -> bool;
    fn write_blocks(&mut self, src: &[u8], block: u32, count: u32) -> bool;
}

pub trait Storage {
    fn unlock(&mut self, pin: &[u8], salt: &Salt) -> SecBool;
    fn lock(&mut self);
    fn is_unlocked(&mut self) -> SecBool;
    fn has_pin(&mut self) -> SecBool;
    fn pin_rem(&mut self) -> u32;
    fn change_pin(
        &mut self,
        old_pin: &[u8],
        new_pin: &[u8],
        old_salt: &Salt,
        new_salt: &Salt,
    ) -> SecBool;
    /// Wipes the device if `pin` is the wipe code.
    fn ensure_not_wipe_code(&mut self, pin: &[u8]);
    fn has_wipe_code(&mut self) -> SecBool;
    fn change_wipe_code(
        &mut self,
        pin: &[u8],
        salt: &Salt,
        wipe_code: &[u8],
    ) -> SecBool;
    fn has(&mut self, key: u16) -> SecBool;
    /// Reads a value. On success `len` holds its full length, which may be
    /// larger than `val` when only the length was asked for.
    fn get(&mut self, key: u16, val: &mut [u8], len: &mut u16) -> SecBool;
    fn set(&mut self, key: u16, val: &[u8]) -> SecBool;
    fn delete(&mut self, key: u16) -> SecBool;
    fn set_counter(&mut self, key: u16, count: u32) -> SecBool;
    fn next_counter(&mut self, key: u16, count: &mut u32) -> SecBool;
    fn wipe(&mut self);
}

pub trait Entropy {
    fn entropy(&mut self, buf: &mut [u8; HW_ENTROPY_LEN]);
    fn rng(&mut self) -> u32;
}

pub trait Secret {
    fn unit_properties(&mut self) -> UnitProperties;
    fn bootloader_locked(&mut self) -> SecBool;
}

pub trait Translations {
    fn write(&mut self, data: &[u8], offset: u32) -> bool;
    /// Address and length of the stored blob from `offset` on. The address
    /// is inside the assets area, which the task can read.
    fn read(&mut self, offset: u32) -> (usize, u32);
    fn erase(&mut self) -> bool;
    fn area_bytesize(&mut self) -> u32;
}

pub trait Firmware {
    fn vendor(&mut self, buf: &mut [u8]) -> bool;
    fn hash_start(&mut self, challenge: &[u8]) -> bool;
    /// Advances the hash. Returns progress in percent, 100 once `hash` is
    /// filled in, or a negative value on failure.
    fn hash_continue(&mut self, hash: &mut [u8]) -> i32;
}

pub trait Optiga {
    fn sign(
        &mut self,
        index: u8,
        digest: &[u8],
        sig: &mut [u8],
        sig_len: &mut usize,
    ) -> i32;
    fn cert_size(&mut self, index: u8, size: &mut usize) -> bool;
    fn read_cert(
        &mut self,
        index: u8,
        cert: &mut [u8],
        cert_len: &mut usize,
    ) -> bool;
    fn read_sec(&mut self, sec: &mut u8) -> bool;
    fn random_buffer(&mut self, dest: &mut [u8]) -> bool;
    fn set_sec_max(&mut self);
}

pub trait Input {
    fn button_event(&mut self) -> Option<ButtonEvent>;
    /// Packed touch event, or 0 if none is pending.
    fn touch_event(&mut self) -> u32;
}

pub trait Haptic {
    fn set_enabled(&mut self, enabled: bool);
    fn enabled(&mut self) -> bool;
    fn test(&mut self, duration_ms: u16) -> bool;
    fn play(&mut self, effect: u32) -> bool;
    fn play_custom(&mut self, amplitude: i8, duration_ms: u16) -> bool;
}

pub trait RgbLed {
    fn set_color(&mut self, color: u32);
}

/// Pixel operations the DMA2D engine performs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Dma2dOp {
    Rgb565Fill,
    Rgb565CopyMono4,
    Rgb565CopyRgb565,
    Rgb565BlendMono4,
    Rgb565BlendMono8,
    Rgba8888Fill,
    Rgba8888CopyMono4,
    Rgba8888CopyRgb565,
    Rgba8888CopyRgba8888,
    Rgba8888BlendMono4,
    Rgba8888BlendMono8,
}

impl Dma2dOp {
    /// Whether the operation reads a source bitmap. Fills only write.
    pub fn reads_source(self) -> bool {
        !matches!(self, Dma2dOp::Rgb565Fill | Dma2dOp::Rgba8888Fill)
    }
}

/// The 2D graphics accelerator. It works on physical addresses, so it gets
/// the request itself rather than borrowed slices.
pub trait Dma2d {
    /// Waits for the previous operation to finish.
    fn wait(&mut self);
    /// Starts `op`. The destination rows (and the source rows, if `op`
    /// reads any) have been checked against the task's memory.
    fn start(&mut self, op: Dma2dOp, bb: &Bitblt) -> bool;
}

/// The Bluetooth co-processor link.
pub trait Ble {
    fn start(&mut self);
    fn issue_command(&mut self, command: &BleCommand) -> bool;
    /// Takes the oldest pending event, if there is one.
    fn event(&mut self) -> Option<BleEvent>;
    fn state(&mut self) -> BleState;
    fn can_write(&mut self) -> bool;
    fn write(&mut self, data: &[u8]) -> bool;
    fn can_read(&mut self) -> bool;
    /// Returns the number of bytes placed in `data`.
    fn read(&mut self, data: &mut [u8]) -> u32;
}

pub trait PowerManager {
    /// Suspends until a wakeup source fires, and records which ones did.
    fn suspend(&mut self, wakeup: &mut u32) -> PmStatus;
    fn hibernate(&mut self) -> PmStatus;
    fn state(&mut self, state: &mut PmState) -> PmStatus;
    /// Takes the events raised since the last call, if any.
    fn events(&mut self) -> Option<PmEvents>;
}

/// Everything a board supplies to the kernel.
///
/// Subsystems a board lacks return `None`; calls aimed at them are treated
/// like calls to a syscall that doesn't exist.
pub trait Platform {
    fn systick(&mut self) -> &mut dyn Systick;
    fn sysevents(&mut self) -> &mut dyn SysEvents;
    fn boot(&mut self) -> &mut dyn Boot;
    fn display(&mut self) -> &mut dyn Display;
    fn usb(&mut self) -> &mut dyn Usb;
    fn usb_class(&mut self, class: UsbClassKind) -> &mut dyn UsbClass;
    fn storage(&mut self) -> &mut dyn Storage;
    fn entropy(&mut self) -> &mut dyn Entropy;
    fn secret(&mut self) -> &mut dyn Secret;
    fn translations(&mut self) -> &mut dyn Translations;
    fn firmware(&mut self) -> &mut dyn Firmware;

    fn sdcard(&mut self) -> Option<&mut dyn SdCard> {
        None
    }
    fn optiga(&mut self) -> Option<&mut dyn Optiga> {
        None
    }
    fn input(&mut self) -> Option<&mut dyn Input> {
        None
    }
    fn haptic(&mut self) -> Option<&mut dyn Haptic> {
        None
    }
    fn rgb_led(&mut self) -> Option<&mut dyn RgbLed> {
        None
    }
    fn dma2d(&mut self) -> Option<&mut dyn Dma2d> {
        None
    }
    fn ble(&mut self) -> Option<&mut dyn Ble> {
        None
    }
    fn power_manager(&mut self) -> Option<&mut dyn PowerManager> {
        None
    }

    /// Called once, after the task has ended, with how it ended. This is
    /// where a board shows the error screen or resets.
    fn task_terminated(&mut self, how: &Termination);
}
