// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syscall dispatch.
//!
//! # Syscall implementations
//!
//! Every syscall has a *verifier*: a function that checks the caller's
//! arguments, copies them into kernel memory, calls into the driver and
//! copies results back. Verifiers have the signature:
//!
//! ```ignore
//! fn my_syscall(cx: &mut Cx<'_>, args: &Args<'_>) -> Result<Ret, UserError>
//! ```
//!
//! The `Ret` becomes the task's return registers. A `UserError` means the
//! call produced no result: either the caller broke the rules, which ends
//! the task, or the call was one of the exits, which already has. Either
//! way the dispatcher, not the verifier, is the one that reports the
//! termination, so it happens exactly once per task.
//!
//! A verifier must not call into a driver before every probe has passed.

use abi::wire::{Args, Ret, RetSlots, Slots};
use abi::{FaultInfo, Sysnum, UsageError};
use ringbuf::{ringbuf, ringbuf_entry};

use crate::drivers::Platform;
use crate::err::UserError;
use crate::task::{Task, Terminated};
use crate::umem::UserMem;

mod ble;
mod display;
mod dma2d;
mod input;
mod power;
mod security;
mod sdcard;
mod storage;
mod system;
mod usb;

/// What to do with the task after a trap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resume {
    /// Write these into the return registers and resume the task.
    Return(RetSlots),
    /// The task is gone; don't resume it.
    Terminated,
}

/// Everything a verifier can reach.
pub(crate) struct Cx<'k> {
    pub mem: UserMem<'k>,
    pub task: &'k mut Task,
    pub hw: &'k mut dyn Platform,
}

impl Cx<'_> {
    /// Reports the task's end to the platform, the first time only.
    pub fn finish(&mut self, _proof: Terminated) -> Resume {
        if let Some(how) = self.task.take_report() {
            ringbuf_entry!(Trace::Terminated);
            klog!("task terminated: {:?}", how);
            self.hw.task_terminated(how);
        }
        Resume::Terminated
    }
}

type Verifier = fn(&mut Cx<'_>, &Args<'_>) -> Result<Ret, UserError>;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    Refused(u32),
    Violation { nr: u32, fault: FaultInfo },
    Terminated,
}

ringbuf!(Trace, 16, Trace::None);

/// Entry point for a trap with syscall number `nr` and the argument
/// registers in `slots`.
pub(crate) fn syscall_entry(cx: &mut Cx<'_>, nr: u32, slots: &Slots) -> Resume {
    if !cx.task.is_running() {
        // A terminated task gets nothing, not even a second report.
        ringbuf_entry!(Trace::Refused(nr));
        return Resume::Terminated;
    }

    match invoke(cx, nr, slots) {
        Ok(ret) => Resume::Return(ret.lower()),
        Err(UserError::Violation(fault)) => {
            ringbuf_entry!(Trace::Violation { nr, fault });
            let t = cx.task.access_violation(fault);
            cx.finish(t)
        }
        Err(UserError::Terminated(t)) => cx.finish(t),
    }
}

fn invoke(cx: &mut Cx<'_>, nr: u32, slots: &Slots) -> Result<Ret, UserError> {
    let nr = Sysnum::try_from(nr)?;
    let desc = nr.desc();
    let ret = verifier(nr)(cx, &Args::new(desc, slots))?;
    debug_assert_eq!(ret.width(), desc.ret, "{nr:?}");
    Ok(ret)
}

/// Maps a missing optional subsystem to the same fault as an unknown
/// syscall number.
fn present<T: ?Sized>(driver: Option<&mut T>) -> Result<&mut T, UserError> {
    driver.ok_or(UserError::from(UsageError::BadSyscallNumber))
}

fn verifier(nr: Sysnum) -> Verifier {
    use dma2d::{
        Rgb565BlendMono4, Rgb565BlendMono8, Rgb565CopyMono4, Rgb565CopyRgb565,
        Rgb565Fill, Rgba8888BlendMono4, Rgba8888BlendMono8, Rgba8888CopyMono4,
        Rgba8888CopyRgb565, Rgba8888CopyRgba8888, Rgba8888Fill,
    };
    use usb::{Hid, Vcp, WebUsb};

    match nr {
        Sysnum::SystemExit => system::exit,
        Sysnum::SystemExitError => system::exit_error,
        Sysnum::SystemExitFatal => system::exit_fatal,
        Sysnum::RebootDevice => system::reboot_device,
        Sysnum::RebootToBootloader => system::reboot_to_bootloader,
        Sysnum::RebootAndUpgrade => system::reboot_and_upgrade,

        Sysnum::SystickCycles => system::systick_cycles,
        Sysnum::SystickMs => system::systick_ms,
        Sysnum::SystickUs => system::systick_us,
        Sysnum::SystickUsToCycles => system::systick_us_to_cycles,

        Sysnum::SysEventsPoll => system::sysevents_poll,

        Sysnum::BootImageCheck => system::boot_image_check,
        Sysnum::BootImageReplace => system::boot_image_replace,

        Sysnum::DisplaySetBacklight => display::set_backlight,
        Sysnum::DisplayGetBacklight => display::get_backlight,
        Sysnum::DisplaySetOrientation => display::set_orientation,
        Sysnum::DisplayGetOrientation => display::get_orientation,
        Sysnum::DisplayGetFbInfo => display::get_fb_info,
        Sysnum::DisplayWaitForSync => display::wait_for_sync,
        Sysnum::DisplayRefresh => display::refresh,
        Sysnum::DisplayFill => display::fill,
        Sysnum::DisplayCopyRgb565 => display::copy_rgb565,

        Sysnum::UsbInit => usb::init,
        Sysnum::UsbDeinit => usb::deinit,
        Sysnum::UsbStart => usb::start,
        Sysnum::UsbStop => usb::stop,
        Sysnum::UsbGetEvent => usb::get_event,
        Sysnum::UsbGetState => usb::get_state,

        Sysnum::UsbHidAdd => usb::add::<Hid>,
        Sysnum::UsbHidCanRead => usb::can_read::<Hid>,
        Sysnum::UsbHidCanWrite => usb::can_write::<Hid>,
        Sysnum::UsbHidRead => usb::read::<Hid>,
        Sysnum::UsbHidWrite => usb::write::<Hid>,
        Sysnum::UsbHidReadSelect => usb::read_select::<Hid>,
        Sysnum::UsbHidReadBlocking => usb::read_blocking::<Hid>,
        Sysnum::UsbHidWriteBlocking => usb::write_blocking::<Hid>,

        Sysnum::UsbVcpAdd => usb::add::<Vcp>,
        Sysnum::UsbVcpCanRead => usb::can_read::<Vcp>,
        Sysnum::UsbVcpCanWrite => usb::can_write::<Vcp>,
        Sysnum::UsbVcpRead => usb::read::<Vcp>,
        Sysnum::UsbVcpWrite => usb::write::<Vcp>,
        Sysnum::UsbVcpReadBlocking => usb::read_blocking::<Vcp>,
        Sysnum::UsbVcpWriteBlocking => usb::write_blocking::<Vcp>,

        Sysnum::UsbWebUsbAdd => usb::add::<WebUsb>,
        Sysnum::UsbWebUsbCanRead => usb::can_read::<WebUsb>,
        Sysnum::UsbWebUsbCanWrite => usb::can_write::<WebUsb>,
        Sysnum::UsbWebUsbRead => usb::read::<WebUsb>,
        Sysnum::UsbWebUsbWrite => usb::write::<WebUsb>,
        Sysnum::UsbWebUsbReadSelect => usb::read_select::<WebUsb>,
        Sysnum::UsbWebUsbReadBlocking => usb::read_blocking::<WebUsb>,
        Sysnum::UsbWebUsbWriteBlocking => usb::write_blocking::<WebUsb>,

        Sysnum::SdCardPowerOn => sdcard::power_on,
        Sysnum::SdCardPowerOff => sdcard::power_off,
        Sysnum::SdCardIsPresent => sdcard::is_present,
        Sysnum::SdCardGetCapacity => sdcard::get_capacity,
        Sysnum::SdCardReadBlocks => sdcard::read_blocks,
        Sysnum::SdCardWriteBlocks => sdcard::write_blocks,

        Sysnum::UnitPropertiesGet => system::unit_properties_get,
        Sysnum::SecretBootloaderLocked => system::bootloader_locked,

        Sysnum::StorageUnlock => storage::unlock,
        Sysnum::StorageLock => storage::lock,
        Sysnum::StorageIsUnlocked => storage::is_unlocked,
        Sysnum::StorageHasPin => storage::has_pin,
        Sysnum::StorageGetPinRem => storage::get_pin_rem,
        Sysnum::StorageChangePin => storage::change_pin,
        Sysnum::StorageEnsureNotWipeCode => storage::ensure_not_wipe_code,
        Sysnum::StorageHasWipeCode => storage::has_wipe_code,
        Sysnum::StorageChangeWipeCode => storage::change_wipe_code,
        Sysnum::StorageHas => storage::has,
        Sysnum::StorageGet => storage::get,
        Sysnum::StorageSet => storage::set,
        Sysnum::StorageDelete => storage::delete,
        Sysnum::StorageSetCounter => storage::set_counter,
        Sysnum::StorageNextCounter => storage::next_counter,
        Sysnum::StorageWipe => storage::wipe,

        Sysnum::EntropyGet => system::entropy_get,
        Sysnum::RngGet => system::rng_get,

        Sysnum::TranslationsWrite => security::translations_write,
        Sysnum::TranslationsRead => security::translations_read,
        Sysnum::TranslationsErase => security::translations_erase,
        Sysnum::TranslationsAreaBytesize => security::translations_area_bytesize,

        Sysnum::FirmwareGetVendor => security::firmware_get_vendor,
        Sysnum::FirmwareHashStart => security::firmware_hash_start,
        Sysnum::FirmwareHashContinue => security::firmware_hash_continue,

        Sysnum::OptigaSign => security::optiga_sign,
        Sysnum::OptigaCertSize => security::optiga_cert_size,
        Sysnum::OptigaReadCert => security::optiga_read_cert,
        Sysnum::OptigaReadSec => security::optiga_read_sec,
        Sysnum::OptigaRandomBuffer => security::optiga_random_buffer,
        Sysnum::OptigaSetSecMax => security::optiga_set_sec_max,

        Sysnum::ButtonGetEvent => input::button_get_event,
        Sysnum::TouchGetEvent => input::touch_get_event,
        Sysnum::HapticSetEnabled => input::haptic_set_enabled,
        Sysnum::HapticGetEnabled => input::haptic_get_enabled,
        Sysnum::HapticTest => input::haptic_test,
        Sysnum::HapticPlay => input::haptic_play,
        Sysnum::HapticPlayCustom => input::haptic_play_custom,
        Sysnum::RgbLedSetColor => input::rgb_led_set_color,

        Sysnum::Dma2dWait => dma2d::wait,
        Sysnum::Dma2dRgb565Fill => dma2d::start::<Rgb565Fill>,
        Sysnum::Dma2dRgb565CopyMono4 => dma2d::start::<Rgb565CopyMono4>,
        Sysnum::Dma2dRgb565CopyRgb565 => dma2d::start::<Rgb565CopyRgb565>,
        Sysnum::Dma2dRgb565BlendMono4 => dma2d::start::<Rgb565BlendMono4>,
        Sysnum::Dma2dRgb565BlendMono8 => dma2d::start::<Rgb565BlendMono8>,
        Sysnum::Dma2dRgba8888Fill => dma2d::start::<Rgba8888Fill>,
        Sysnum::Dma2dRgba8888CopyMono4 => dma2d::start::<Rgba8888CopyMono4>,
        Sysnum::Dma2dRgba8888CopyRgb565 => dma2d::start::<Rgba8888CopyRgb565>,
        Sysnum::Dma2dRgba8888CopyRgba8888 => {
            dma2d::start::<Rgba8888CopyRgba8888>
        }
        Sysnum::Dma2dRgba8888BlendMono4 => dma2d::start::<Rgba8888BlendMono4>,
        Sysnum::Dma2dRgba8888BlendMono8 => dma2d::start::<Rgba8888BlendMono8>,

        Sysnum::BleStart => ble::start,
        Sysnum::BleIssueCommand => ble::issue_command,
        Sysnum::BleGetEvent => ble::get_event,
        Sysnum::BleGetState => ble::get_state,
        Sysnum::BleCanWrite => ble::can_write,
        Sysnum::BleWrite => ble::write,
        Sysnum::BleCanRead => ble::can_read,
        Sysnum::BleRead => ble::read,

        Sysnum::PmSuspend => power::suspend,
        Sysnum::PmHibernate => power::hibernate,
        Sysnum::PmGetState => power::get_state,
        Sysnum::PmGetEvents => power::get_events,
    }
}
