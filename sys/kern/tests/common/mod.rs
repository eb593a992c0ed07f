// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A kernel on the host, with a board that writes down everything it's
//! asked to do.
//!
//! Task memory is real host memory: 32-byte aligned blocks that are leaked
//! so their addresses stay valid for the life of the test.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use abi::wire::{lower, Arg, RetSlots, Slots};
use abi::{
    Bitblt, BleCommand, BleEvent, BleState, BootImage, ButtonEvent, FbInfo,
    PmEvents, PmState, PmStatus, SecBool, Sysnum, UnitProperties, UsbClassInfo,
    UsbDevInfo, UsbState, HW_ENTROPY_LEN, UPGRADE_HASH_LEN,
};
use kern::descs::{MemoryMap, REGION_ALIGN};
use kern::drivers::{
    Ble, Boot, Display, Dma2d, Dma2dOp, Entropy, Firmware, Haptic, Input,
    Optiga, Platform, PowerManager, RgbLed, Salt, SdCard, Secret, Storage,
    SysEvents, Systick, Translations, Usb, UsbClass, UsbClassKind,
};
use kern::mpu::{AppletLayout, Area, MpuCell, MpuMode};
use kern::startup::Kernel;
use kern::syscalls::Resume;
use kern::task::{TaskState, Termination};

const BLOCK: usize = 4096;

#[repr(C, align(32))]
struct Block([u8; BLOCK]);

/// A leaked, aligned piece of host memory handed to the task.
#[derive(Copy, Clone, Debug)]
pub struct Buf {
    pub addr: usize,
    pub len: usize,
}

impl Buf {
    pub fn alloc(len: usize) -> Self {
        assert!(len <= BLOCK && len % 32 == 0);
        let p = Box::into_raw(Box::new(Block([0; BLOCK])));
        Self {
            addr: p as usize,
            len,
        }
    }

    pub fn area(&self) -> Area {
        Area::new(self.addr, self.len)
    }

    pub fn at(&self, offset: usize) -> usize {
        self.addr + offset
    }

    pub fn end(&self) -> usize {
        self.addr + self.len
    }

    pub fn put(&self, offset: usize, bytes: &[u8]) {
        assert!(offset + bytes.len() <= BLOCK);
        // Safety: inside our own leaked block.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                (self.addr + offset) as *mut u8,
                bytes.len(),
            );
        }
    }

    pub fn get(&self, offset: usize, len: usize) -> Vec<u8> {
        assert!(offset + len <= BLOCK);
        // Safety: inside our own leaked block.
        unsafe {
            std::slice::from_raw_parts((self.addr + offset) as *const u8, len)
                .to_vec()
        }
    }

    /// Places a copy of `v` at `offset`, byte for byte.
    pub fn put_value<T: Copy>(&self, offset: usize, v: T) {
        assert!(offset + std::mem::size_of::<T>() <= BLOCK);
        // Safety: inside our own leaked block; the write is unaligned.
        unsafe {
            std::ptr::write_unaligned((self.addr + offset) as *mut T, v);
        }
    }

    pub fn get_value<T: Copy>(&self, offset: usize) -> T {
        assert!(offset + std::mem::size_of::<T>() <= BLOCK);
        // Safety: as above. Only used for plain-data types.
        unsafe { std::ptr::read_unaligned((self.addr + offset) as *const T) }
    }
}

/// What the board was asked to do.
#[derive(Debug, Default)]
pub struct Log {
    pub calls: Vec<&'static str>,
    pub terminations: Vec<Termination>,
    pub salts: Vec<Salt>,
    pub pins: Vec<Vec<u8>>,
    pub lengths: Vec<usize>,
    pub dma2d_ops: Vec<Dma2dOp>,
    pub ble_commands: Vec<u32>,
}

pub struct FakeBoard {
    log: Rc<RefCell<Log>>,
    mpu: &'static MpuCell,
    /// Applet to load from inside the next driver call that moves data.
    switch: Rc<Cell<Option<AppletLayout>>>,
    fb: Option<FbInfo>,
    assets: usize,
    optional: bool,
    backlight: i32,
    haptic: bool,
}

impl FakeBoard {
    fn note(&self, call: &'static str) {
        self.log.borrow_mut().calls.push(call);
    }

    /// Loads a different applet while the kernel is in the middle of a call,
    /// as an interrupt handler might.
    fn maybe_switch_applet(&self) {
        if let Some(layout) = self.switch.take() {
            self.mpu.set_active_applet(layout);
        }
    }

    fn note_len(&self, call: &'static str, len: usize) {
        let mut log = self.log.borrow_mut();
        log.calls.push(call);
        log.lengths.push(len);
    }
}

impl Systick for FakeBoard {
    fn cycles(&mut self) -> u64 {
        self.note("cycles");
        0x1_2345_6789
    }
    fn ms(&mut self) -> u32 {
        self.note("ms");
        1000
    }
    fn us(&mut self) -> u64 {
        self.note("us");
        u64::from(u32::MAX) + 7
    }
    fn us_to_cycles(&mut self, us: u64) -> u64 {
        self.note("us_to_cycles");
        us.wrapping_mul(3)
    }
}

impl SysEvents for FakeBoard {
    fn poll(&mut self, awaited: &abi::SysEvents, _deadline: u32) -> abi::SysEvents {
        self.note("poll");
        abi::SysEvents {
            read_ready: awaited.read_ready & 0b01,
            write_ready: awaited.write_ready,
        }
    }
}

impl Boot for FakeBoard {
    fn reboot_device(&mut self) -> ! {
        panic!("reboot");
    }
    fn reboot_to_bootloader(&mut self) -> ! {
        panic!("reboot to bootloader");
    }
    fn reboot_and_upgrade(&mut self, _hash: &[u8; UPGRADE_HASH_LEN]) -> ! {
        panic!("reboot and upgrade");
    }
    fn image_check(&mut self, image: &BootImage, bytes: &[u8]) -> bool {
        self.note_len("image_check", bytes.len());
        bytes.len() == image.image_size as usize
    }
    fn image_replace(&mut self, _image: &BootImage, bytes: &[u8]) {
        self.note_len("image_replace", bytes.len());
    }
}

impl Display for FakeBoard {
    fn set_backlight(&mut self, level: i32) -> i32 {
        self.note("set_backlight");
        self.backlight = level;
        level
    }
    fn backlight(&mut self) -> i32 {
        self.note("backlight");
        self.backlight
    }
    fn set_orientation(&mut self, angle: i32) -> i32 {
        self.note("set_orientation");
        angle
    }
    fn orientation(&mut self) -> i32 {
        self.note("orientation");
        0
    }
    fn fb_info(&mut self) -> Option<FbInfo> {
        self.note("fb_info");
        self.fb
    }
    fn wait_for_sync(&mut self) {
        self.note("wait_for_sync");
    }
    fn refresh(&mut self) {
        self.note("refresh");
    }
    fn fill(&mut self, _bb: &Bitblt) {
        self.note("fill");
    }
    fn copy_rgb565(&mut self, _bb: &Bitblt, src: &[u8]) {
        self.note_len("copy_rgb565", src.len());
    }
}

impl Usb for FakeBoard {
    fn init(&mut self, _info: &UsbDevInfo) -> bool {
        self.note("usb_init");
        true
    }
    fn deinit(&mut self) {
        self.note("usb_deinit");
    }
    fn start(&mut self) -> bool {
        self.note("usb_start");
        true
    }
    fn stop(&mut self) {
        self.note("usb_stop");
    }
    fn event(&mut self) -> u32 {
        self.note("usb_event");
        0
    }
    fn state(&mut self) -> UsbState {
        self.note("usb_state");
        UsbState { configured: 1 }
    }
}

impl UsbClass for FakeBoard {
    fn add(&mut self, _info: &UsbClassInfo) -> bool {
        self.note("class_add");
        true
    }
    fn can_read(&mut self, _iface: u8) -> bool {
        self.note("can_read");
        true
    }
    fn can_write(&mut self, _iface: u8) -> bool {
        self.note("can_write");
        true
    }
    fn read(&mut self, _iface: u8, buf: &mut [u8]) -> i32 {
        self.maybe_switch_applet();
        self.note_len("class_read", buf.len());
        buf.fill(0xAB);
        buf.len() as i32
    }
    fn write(&mut self, _iface: u8, buf: &[u8]) -> i32 {
        self.note_len("class_write", buf.len());
        buf.len() as i32
    }
    fn read_select(&mut self, _timeout: u32) -> i32 {
        self.note("read_select");
        1
    }
    fn read_blocking(&mut self, iface: u8, buf: &mut [u8], _timeout: i32) -> i32 {
        UsbClass::read(self, iface, buf)
    }
    fn write_blocking(&mut self, iface: u8, buf: &[u8], _timeout: i32) -> i32 {
        UsbClass::write(self, iface, buf)
    }
}

impl SdCard for FakeBoard {
    fn power_on(&mut self) -> bool {
        self.note("sd_power_on");
        true
    }
    fn power_off(&mut self) {
        self.note("sd_power_off");
    }
    fn is_present(&mut self) -> bool {
        self.note("sd_is_present");
        true
    }
    fn capacity(&mut self) -> u64 {
        self.note("sd_capacity");
        1 << 33
    }
    fn read_blocks(&mut self, dest: &mut [u8], _block: u32, _count: u32) -> bool {
        self.note_len("sd_read", dest.len());
        dest.fill(0x5D);
        true
    }
    fn write_blocks(&mut self, src: &[u8], _block: u32, _count: u32) -> bool {
        self.note_len("sd_write", src.len());
        true
    }
}

impl Storage for FakeBoard {
    fn unlock(&mut self, pin: &[u8], salt: &Salt) -> SecBool {
        self.note("unlock");
        let mut log = self.log.borrow_mut();
        log.pins.push(pin.to_vec());
        log.salts.push(*salt);
        (pin == b"1234").into()
    }
    fn lock(&mut self) {
        self.note("lock");
    }
    fn is_unlocked(&mut self) -> SecBool {
        self.note("is_unlocked");
        SecBool::TRUE
    }
    fn has_pin(&mut self) -> SecBool {
        self.note("has_pin");
        SecBool::TRUE
    }
    fn pin_rem(&mut self) -> u32 {
        self.note("pin_rem");
        16
    }
    fn change_pin(
        &mut self,
        old_pin: &[u8],
        new_pin: &[u8],
        old_salt: &Salt,
        new_salt: &Salt,
    ) -> SecBool {
        self.note("change_pin");
        let mut log = self.log.borrow_mut();
        log.pins.push(old_pin.to_vec());
        log.pins.push(new_pin.to_vec());
        log.salts.push(*old_salt);
        log.salts.push(*new_salt);
        SecBool::TRUE
    }
    fn ensure_not_wipe_code(&mut self, pin: &[u8]) {
        self.note("ensure_not_wipe_code");
        self.log.borrow_mut().pins.push(pin.to_vec());
    }
    fn has_wipe_code(&mut self) -> SecBool {
        self.note("has_wipe_code");
        SecBool::FALSE
    }
    fn change_wipe_code(
        &mut self,
        _pin: &[u8],
        _salt: &Salt,
        _wipe_code: &[u8],
    ) -> SecBool {
        self.note("change_wipe_code");
        SecBool::TRUE
    }
    fn has(&mut self, _key: u16) -> SecBool {
        self.note("has");
        SecBool::TRUE
    }
    fn get(&mut self, _key: u16, val: &mut [u8], len: &mut u16) -> SecBool {
        self.maybe_switch_applet();
        self.note_len("get", val.len());
        const VALUE: &[u8] = b"value";
        *len = VALUE.len() as u16;
        if val.len() >= VALUE.len() {
            val[..VALUE.len()].copy_from_slice(VALUE);
        }
        SecBool::TRUE
    }
    fn set(&mut self, _key: u16, val: &[u8]) -> SecBool {
        self.note_len("set", val.len());
        SecBool::TRUE
    }
    fn delete(&mut self, _key: u16) -> SecBool {
        self.note("delete");
        SecBool::TRUE
    }
    fn set_counter(&mut self, _key: u16, _count: u32) -> SecBool {
        self.note("set_counter");
        SecBool::TRUE
    }
    fn next_counter(&mut self, _key: u16, count: &mut u32) -> SecBool {
        self.note("next_counter");
        *count = 42;
        SecBool::TRUE
    }
    fn wipe(&mut self) {
        self.note("wipe");
    }
}

impl Entropy for FakeBoard {
    fn entropy(&mut self, buf: &mut [u8; HW_ENTROPY_LEN]) {
        self.note("entropy");
        buf.fill(0x11);
    }
    fn rng(&mut self) -> u32 {
        self.note("rng");
        4
    }
}

impl Secret for FakeBoard {
    fn unit_properties(&mut self) -> UnitProperties {
        self.note("unit_properties");
        UnitProperties {
            color: 3,
            ..Default::default()
        }
    }
    fn bootloader_locked(&mut self) -> SecBool {
        self.note("bootloader_locked");
        SecBool::TRUE
    }
}

impl Translations for FakeBoard {
    fn write(&mut self, data: &[u8], _offset: u32) -> bool {
        self.note_len("translations_write", data.len());
        true
    }
    fn read(&mut self, offset: u32) -> (usize, u32) {
        self.note("translations_read");
        (self.assets + offset as usize, 16)
    }
    fn erase(&mut self) -> bool {
        self.note("translations_erase");
        true
    }
    fn area_bytesize(&mut self) -> u32 {
        self.note("translations_area_bytesize");
        0x1000
    }
}

impl Firmware for FakeBoard {
    fn vendor(&mut self, buf: &mut [u8]) -> bool {
        self.note_len("vendor", buf.len());
        let n = buf.len().min(6);
        buf[..n].copy_from_slice(&b"vendor"[..n]);
        true
    }
    fn hash_start(&mut self, challenge: &[u8]) -> bool {
        self.note_len("hash_start", challenge.len());
        true
    }
    fn hash_continue(&mut self, hash: &mut [u8]) -> i32 {
        self.note_len("hash_continue", hash.len());
        hash.fill(0xEE);
        100
    }
}

impl Optiga for FakeBoard {
    fn sign(
        &mut self,
        _index: u8,
        digest: &[u8],
        sig: &mut [u8],
        sig_len: &mut usize,
    ) -> i32 {
        self.note_len("sign", digest.len());
        let n = digest.len().min(sig.len());
        sig[..n].copy_from_slice(&digest[..n]);
        *sig_len = n;
        0
    }
    fn cert_size(&mut self, _index: u8, size: &mut usize) -> bool {
        self.note("cert_size");
        *size = 300;
        true
    }
    fn read_cert(&mut self, _index: u8, cert: &mut [u8], cert_len: &mut usize) -> bool {
        self.note_len("read_cert", cert.len());
        *cert_len = cert.len().min(300);
        true
    }
    fn read_sec(&mut self, sec: &mut u8) -> bool {
        self.note("read_sec");
        *sec = 5;
        true
    }
    fn random_buffer(&mut self, dest: &mut [u8]) -> bool {
        self.note_len("random_buffer", dest.len());
        dest.fill(0x42);
        true
    }
    fn set_sec_max(&mut self) {
        self.note("set_sec_max");
    }
}

impl Input for FakeBoard {
    fn button_event(&mut self) -> Option<ButtonEvent> {
        self.note("button_event");
        Some(ButtonEvent { button: 1, kind: 2 })
    }
    fn touch_event(&mut self) -> u32 {
        self.note("touch_event");
        0x0102
    }
}

impl Haptic for FakeBoard {
    fn set_enabled(&mut self, enabled: bool) {
        self.note("haptic_set_enabled");
        self.haptic = enabled;
    }
    fn enabled(&mut self) -> bool {
        self.note("haptic_enabled");
        self.haptic
    }
    fn test(&mut self, _duration_ms: u16) -> bool {
        self.note("haptic_test");
        true
    }
    fn play(&mut self, _effect: u32) -> bool {
        self.note("haptic_play");
        true
    }
    fn play_custom(&mut self, amplitude: i8, _duration_ms: u16) -> bool {
        self.note("haptic_play_custom");
        amplitude >= 0
    }
}

impl RgbLed for FakeBoard {
    fn set_color(&mut self, _color: u32) {
        self.note("rgb_led");
    }
}

impl Dma2d for FakeBoard {
    fn wait(&mut self) {
        self.note("dma2d_wait");
    }
    fn start(&mut self, op: Dma2dOp, _bb: &Bitblt) -> bool {
        self.note("dma2d_start");
        self.log.borrow_mut().dma2d_ops.push(op);
        true
    }
}

impl Ble for FakeBoard {
    fn start(&mut self) {
        self.note("ble_start");
    }
    fn issue_command(&mut self, command: &BleCommand) -> bool {
        self.note("ble_issue_command");
        self.log.borrow_mut().ble_commands.push(command.kind);
        command.data_len as usize <= command.data.len()
    }
    fn event(&mut self) -> Option<BleEvent> {
        self.note("ble_event");
        Some(BleEvent {
            kind: 3,
            connection_id: -1,
            data_len: 2,
            data: [0xB1, 0xE0, 0, 0, 0, 0, 0, 0],
        })
    }
    fn state(&mut self) -> BleState {
        self.note("ble_state");
        BleState {
            connected: 1,
            peer_count: 2,
            state_known: 1,
            ..Default::default()
        }
    }
    fn can_write(&mut self) -> bool {
        self.note("ble_can_write");
        true
    }
    fn write(&mut self, data: &[u8]) -> bool {
        self.note_len("ble_write", data.len());
        true
    }
    fn can_read(&mut self) -> bool {
        self.note("ble_can_read");
        true
    }
    fn read(&mut self, data: &mut [u8]) -> u32 {
        self.note_len("ble_read", data.len());
        let n = data.len().min(20);
        data[..n].fill(0xB1);
        n as u32
    }
}

impl PowerManager for FakeBoard {
    fn suspend(&mut self, wakeup: &mut u32) -> PmStatus {
        self.note("pm_suspend");
        *wakeup = 0b100;
        PmStatus::OK
    }
    fn hibernate(&mut self) -> PmStatus {
        self.note("pm_hibernate");
        PmStatus::ERROR
    }
    fn state(&mut self, state: &mut PmState) -> PmStatus {
        self.note("pm_state");
        *state = PmState {
            usb_connected: 1,
            charging: 1,
            soc: 87,
            ..Default::default()
        };
        PmStatus::OK
    }
    fn events(&mut self) -> Option<PmEvents> {
        self.note("pm_events");
        None
    }
}

impl Platform for FakeBoard {
    fn systick(&mut self) -> &mut dyn Systick {
        self
    }
    fn sysevents(&mut self) -> &mut dyn SysEvents {
        self
    }
    fn boot(&mut self) -> &mut dyn Boot {
        self
    }
    fn display(&mut self) -> &mut dyn Display {
        self
    }
    fn usb(&mut self) -> &mut dyn Usb {
        self
    }
    fn usb_class(&mut self, _class: UsbClassKind) -> &mut dyn UsbClass {
        self
    }
    fn storage(&mut self) -> &mut dyn Storage {
        self
    }
    fn entropy(&mut self) -> &mut dyn Entropy {
        self
    }
    fn secret(&mut self) -> &mut dyn Secret {
        self
    }
    fn translations(&mut self) -> &mut dyn Translations {
        self
    }
    fn firmware(&mut self) -> &mut dyn Firmware {
        self
    }
    fn sdcard(&mut self) -> Option<&mut dyn SdCard> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn optiga(&mut self) -> Option<&mut dyn Optiga> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn input(&mut self) -> Option<&mut dyn Input> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn haptic(&mut self) -> Option<&mut dyn Haptic> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn rgb_led(&mut self) -> Option<&mut dyn RgbLed> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn dma2d(&mut self) -> Option<&mut dyn Dma2d> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn ble(&mut self) -> Option<&mut dyn Ble> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn power_manager(&mut self) -> Option<&mut dyn PowerManager> {
        if self.optional {
            Some(self)
        } else {
            None
        }
    }
    fn task_terminated(&mut self, how: &Termination) {
        self.log.borrow_mut().terminations.push(how.clone());
    }
}

/// Options for building a [`Fixture`].
pub struct Options {
    /// Whether the optional subsystems exist: SD card, secure element,
    /// input, haptics, LED, DMA2D, Bluetooth and power manager.
    pub optional: bool,
    /// Whether the display reports a frame buffer.
    pub fb: bool,
    /// Where in its block the frame buffer starts. Anything off the region
    /// granularity can't be mapped.
    pub fb_offset: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            optional: true,
            fb: true,
            fb_offset: 0,
        }
    }
}

/// Frame buffer geometry reported by the fake display.
pub const FB_STRIDE: usize = 64;
pub const FB_HEIGHT: u32 = 8;

pub struct Fixture {
    pub mpu: &'static MpuCell,
    pub log: Rc<RefCell<Log>>,
    /// Applet data: readable and writable.
    pub data: Buf,
    /// A window of this thread's stack, granted as the applet's second data
    /// area so stubs can pass their locals.
    pub stack: Area,
    /// Applet code: readable only.
    pub code: Buf,
    /// Assets: readable only.
    pub assets: Buf,
    /// Frame buffer, once the task has asked for it.
    pub fb: Buf,
    /// Memory the task has no claim to.
    pub foreign: Buf,
    switch: Rc<Cell<Option<AppletLayout>>>,
}

std::thread_local! {
    static KERNEL: RefCell<Option<Kernel<'static>>> = const { RefCell::new(None) };
}

/// Unwinds out of a stub when the task ends, since a real task would never
/// run again.
#[derive(Debug)]
pub struct TaskEnded;

fn trap(nr: u32, slots: &Slots) -> RetSlots {
    let resume = KERNEL.with(|k| {
        k.borrow_mut()
            .as_mut()
            .expect("no kernel on this thread")
            .syscall(nr, slots)
    });
    match resume {
        Resume::Return(regs) => regs,
        Resume::Terminated => std::panic::panic_any(TaskEnded),
    }
}

pub fn map_with_assets(assets: Area) -> MemoryMap {
    MemoryMap {
        kernel_flash: Area::new(0x0800_0000, 0x2_0000),
        kernel_ram: Area::new(0x2000_0000, 0x1_0000),
        peripherals: Area::new(0x4000_0000, 0x1000_0000),
        boardcaps: Area::new(0x0801_ff00, 0x100),
        bootloader: Area::new(0x0802_0000, 0x1_0000),
        bootargs: Area::new(0x2001_ff00, 0x100),
        otp: Area::new(0x1fff_7800, 0x200),
        flash_ob: Area::new(0x4002_2040, 0x40),
        secret: Area::new(0x0803_0000, 0x2000),
        storage1: Area::new(0x0804_0000, 0x1_0000),
        storage2: Area::new(0x0805_0000, 0x1_0000),
        assets,
        unused_flash: Area::new(0x0807_0000, 0x1_0000),
        saes: Area::NONE,
    }
}

/// 64 KiB of stack around the caller's frame, mostly below it.
#[inline(never)]
fn stack_window() -> Area {
    let here = 0u8;
    let here = std::hint::black_box(&here) as *const u8 as usize;
    let base = (here - 0xc000) & !(REGION_ALIGN - 1);
    Area::new(base, 0x1_0000)
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    /// Builds a kernel for this thread, running one task in `App` mode, and
    /// routes `userlib` traps to it.
    pub fn with(opts: Options) -> Self {
        let data = Buf::alloc(1024);
        let stack = stack_window();
        let code = Buf::alloc(1024);
        let assets = Buf::alloc(512);
        let fb = Buf::alloc(FB_STRIDE * FB_HEIGHT as usize);
        let foreign = Buf::alloc(256);

        let mpu: &'static MpuCell = Box::leak(Box::new(MpuCell::new()));
        mpu.init(map_with_assets(assets.area()));
        mpu.set_active_applet(AppletLayout {
            data1: data.area(),
            data2: stack,
            code1: code.area(),
            code2: Area::NONE,
        });
        mpu.reconfigure(MpuMode::App);

        let log = Rc::new(RefCell::new(Log::default()));
        let switch = Rc::new(Cell::new(None));
        let board: &'static mut FakeBoard = Box::leak(Box::new(FakeBoard {
            log: log.clone(),
            mpu,
            switch: switch.clone(),
            fb: opts.fb.then_some(FbInfo {
                ptr: fb.at(opts.fb_offset),
                stride: FB_STRIDE,
                width: 32,
                height: FB_HEIGHT,
            }),
            assets: assets.addr,
            optional: opts.optional,
            backlight: 50,
            haptic: false,
        }));

        KERNEL.with(|k| *k.borrow_mut() = Some(Kernel::new(mpu, board)));
        userlib::set_trap_handler(trap);

        Self {
            mpu,
            log,
            data,
            stack,
            code,
            assets,
            fb,
            foreign,
            switch,
        }
    }

    /// Has the board load `layout` from inside the next USB class read or
    /// storage get, after the kernel has checked the call's buffers.
    pub fn switch_applet_during_next_call(&self, layout: AppletLayout) {
        self.switch.set(Some(layout));
    }

    pub fn with_kernel<R>(&self, body: impl FnOnce(&mut Kernel<'static>) -> R) -> R {
        KERNEL.with(|k| body(k.borrow_mut().as_mut().expect("no kernel")))
    }

    /// Takes the kernel off this thread, e.g. to install it.
    pub fn take_kernel(&self) -> Kernel<'static> {
        KERNEL.with(|k| k.borrow_mut().take().expect("no kernel"))
    }

    /// Traps with typed arguments, bypassing the stubs.
    pub fn call(&self, nr: Sysnum, args: &[Arg]) -> Resume {
        let slots = lower(nr.desc(), args);
        self.raw(nr as u32, &slots)
    }

    /// Traps with raw registers.
    pub fn raw(&self, nr: u32, slots: &Slots) -> Resume {
        self.with_kernel(|k| k.syscall(nr, slots))
    }

    /// Runs a stub, which is expected to end the task.
    pub fn expect_end(&self, body: impl FnOnce()) {
        let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(body));
        match r {
            Err(e) if e.is::<TaskEnded>() => {}
            Err(e) => std::panic::resume_unwind(e),
            Ok(()) => panic!("task was expected to end"),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.borrow().calls.clone()
    }

    pub fn terminations(&self) -> Vec<Termination> {
        self.log.borrow().terminations.clone()
    }

    pub fn state(&self) -> TaskState {
        self.with_kernel(|k| k.active_task().state().clone())
    }

    /// Asserts the task was ended for a bad access, reported exactly once,
    /// and that no driver ran.
    pub fn assert_violation_without_io(&self) {
        assert_eq!(self.calls(), Vec::<&str>::new(), "a driver ran");
        let ends = self.terminations();
        assert_eq!(ends.len(), 1, "{ends:?}");
        match &ends[0] {
            Termination::Fatal { message, .. } => {
                assert_eq!(&message[..], b"access violation");
            }
            other => panic!("unexpected termination {other:?}"),
        }
    }

    pub fn returned(r: Resume) -> RetSlots {
        match r {
            Resume::Return(regs) => regs,
            Resume::Terminated => panic!("task was terminated"),
        }
    }
}
