// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kernel ABI definitions, shared between the kernel and the application.
//!
//! Everything that crosses the privilege boundary is described here: the
//! syscall numbers, the shape of each call's arguments and return value, the
//! fixed-layout structures passed by pointer, and the fault records the kernel
//! produces when a caller misbehaves.
//!
//! The syscall table is the contract. Both `userlib` (which issues traps) and
//! the kernel (which decodes them) read argument layouts out of
//! [`SYSCALLS`], so a call cannot be packed one way and unpacked another.

#![cfg_attr(not(test), no_std)]
#![forbid(clippy::wildcard_imports)]

use serde::{Deserialize, Serialize};

mod types;
pub mod wire;

pub use types::{
    BleCommand, BleEvent, BleState, Bitblt, BootImage, ButtonEvent, FbInfo,
    PmEvents, PmState, PmStatus, SecBool, SysEvents, UnitProperties,
    UsbClassInfo, UsbDevInfo, UsbState,
};

/// Number of argument registers available to a syscall.
pub const ARG_SLOTS: usize = 6;

/// Number of return registers; a 64-bit result uses both.
pub const RET_SLOTS: usize = 2;

/// Size of one SD card block, in bytes.
pub const SDCARD_BLOCK_SIZE: u32 = 512;

/// Size of the optional external salt handed to storage PIN operations.
pub const EXTERNAL_SALT_SIZE: usize = 32;

/// Number of bytes produced by a hardware entropy read.
pub const HW_ENTROPY_LEN: usize = 12 + 32;

/// Longest PIN (or wipe code) the storage layer accepts.
pub const MAX_PIN_LEN: usize = 50;

/// Size of the firmware hash handed to `RebootAndUpgrade`.
pub const UPGRADE_HASH_LEN: usize = 32;

/// Capacity of each text field shown on an error or fatal-exit screen. Caller
/// text is truncated to one less than this.
pub const EXIT_TEXT_CAPACITY: usize = 64;

/// Kind of a single syscall argument, as seen by both sides of the trap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgKind {
    /// Unsigned 32-bit scalar. Narrower types ride in the low bits.
    U32,
    /// Signed 32-bit scalar.
    I32,
    /// Address in the caller's address space.
    Ptr,
    /// Byte count paired with a preceding `Ptr`.
    Len,
    /// 64-bit scalar. Occupies two slots, low word first.
    U64,
}

impl ArgKind {
    /// Number of register slots this argument consumes.
    pub const fn slots(self) -> usize {
        match self {
            ArgKind::U64 => 2,
            _ => 1,
        }
    }
}

/// Width of a syscall's return value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RetWidth {
    None,
    W32,
    /// Returned in two registers, low word first.
    W64,
    /// Native address width (32 bits on the target).
    Addr,
}

/// Shape of one syscall.
#[derive(Copy, Clone, Debug)]
pub struct SyscallDesc {
    pub nr: Sysnum,
    pub args: &'static [ArgKind],
    pub ret: RetWidth,
}

impl SyscallDesc {
    /// Total number of register slots consumed by the arguments.
    pub const fn slots(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.args.len() {
            total += self.args[i].slots();
            i += 1;
        }
        total
    }

    /// Index of the first slot holding argument `index`.
    pub const fn slot_of(&self, index: usize) -> usize {
        let mut slot = 0;
        let mut i = 0;
        while i < index {
            slot += self.args[i].slots();
            i += 1;
        }
        slot
    }
}

macro_rules! syscalls {
    ($($name:ident = $nr:literal ($($kind:ident),*) -> $ret:ident;)*) => {
        /// Enumeration of syscall numbers.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum Sysnum {
            $($name = $nr,)*
        }

        /// Every syscall, indexed by number.
        pub const SYSCALLS: &[SyscallDesc] = &[
            $(SyscallDesc {
                nr: Sysnum::$name,
                args: &[$(ArgKind::$kind),*],
                ret: RetWidth::$ret,
            },)*
        ];

        impl core::convert::TryFrom<u32> for Sysnum {
            type Error = UsageError;

            fn try_from(x: u32) -> Result<Self, Self::Error> {
                match x {
                    $($nr => Ok(Self::$name),)*
                    _ => Err(UsageError::BadSyscallNumber),
                }
            }
        }
    };
}

syscalls! {
    SystemExit = 0 (I32) -> None;
    SystemExitError = 1 (Ptr, Len, Ptr, Len, Ptr, Len) -> None;
    SystemExitFatal = 2 (Ptr, Len, Ptr, Len, I32) -> None;
    RebootDevice = 3 () -> None;
    RebootToBootloader = 4 () -> None;
    RebootAndUpgrade = 5 (Ptr) -> None;

    SystickCycles = 6 () -> W64;
    SystickMs = 7 () -> W32;
    SystickUs = 8 () -> W64;
    SystickUsToCycles = 9 (U64) -> W64;

    SysEventsPoll = 10 (Ptr, Ptr, U32) -> None;

    BootImageCheck = 11 (Ptr) -> W32;
    BootImageReplace = 12 (Ptr) -> None;

    DisplaySetBacklight = 13 (U32) -> W32;
    DisplayGetBacklight = 14 () -> W32;
    DisplaySetOrientation = 15 (U32) -> W32;
    DisplayGetOrientation = 16 () -> W32;
    DisplayGetFbInfo = 17 (Ptr) -> W32;
    DisplayWaitForSync = 18 () -> None;
    DisplayRefresh = 19 () -> None;
    DisplayFill = 20 (Ptr) -> None;
    DisplayCopyRgb565 = 21 (Ptr) -> None;

    UsbInit = 22 (Ptr) -> W32;
    UsbDeinit = 23 () -> None;
    UsbStart = 24 () -> W32;
    UsbStop = 25 () -> None;
    UsbGetEvent = 26 () -> W32;
    UsbGetState = 27 (Ptr) -> None;

    UsbHidAdd = 28 (Ptr) -> W32;
    UsbHidCanRead = 29 (U32) -> W32;
    UsbHidCanWrite = 30 (U32) -> W32;
    UsbHidRead = 31 (U32, Ptr, Len) -> W32;
    UsbHidWrite = 32 (U32, Ptr, Len) -> W32;
    UsbHidReadSelect = 33 (U32) -> W32;
    UsbHidReadBlocking = 34 (U32, Ptr, Len, I32) -> W32;
    UsbHidWriteBlocking = 35 (U32, Ptr, Len, I32) -> W32;

    UsbVcpAdd = 36 (Ptr) -> W32;
    UsbVcpCanRead = 37 (U32) -> W32;
    UsbVcpCanWrite = 38 (U32) -> W32;
    UsbVcpRead = 39 (U32, Ptr, Len) -> W32;
    UsbVcpWrite = 40 (U32, Ptr, Len) -> W32;
    UsbVcpReadBlocking = 41 (U32, Ptr, Len, I32) -> W32;
    UsbVcpWriteBlocking = 42 (U32, Ptr, Len, I32) -> W32;

    UsbWebUsbAdd = 43 (Ptr) -> W32;
    UsbWebUsbCanRead = 44 (U32) -> W32;
    UsbWebUsbCanWrite = 45 (U32) -> W32;
    UsbWebUsbRead = 46 (U32, Ptr, Len) -> W32;
    UsbWebUsbWrite = 47 (U32, Ptr, Len) -> W32;
    UsbWebUsbReadSelect = 48 (U32) -> W32;
    UsbWebUsbReadBlocking = 49 (U32, Ptr, Len, I32) -> W32;
    UsbWebUsbWriteBlocking = 50 (U32, Ptr, Len, I32) -> W32;

    SdCardPowerOn = 51 () -> W32;
    SdCardPowerOff = 52 () -> None;
    SdCardIsPresent = 53 () -> W32;
    SdCardGetCapacity = 54 () -> W64;
    SdCardReadBlocks = 55 (Ptr, U32, U32) -> W32;
    SdCardWriteBlocks = 56 (Ptr, U32, U32) -> W32;

    UnitPropertiesGet = 57 (Ptr) -> None;
    SecretBootloaderLocked = 58 () -> W32;

    StorageUnlock = 59 (Ptr, Len, Ptr) -> W32;
    StorageLock = 60 () -> None;
    StorageIsUnlocked = 61 () -> W32;
    StorageHasPin = 62 () -> W32;
    StorageGetPinRem = 63 () -> W32;
    StorageChangePin = 64 (Ptr, Len, Ptr, Len, Ptr, Ptr) -> W32;
    StorageEnsureNotWipeCode = 65 (Ptr, Len) -> None;
    StorageHasWipeCode = 66 () -> W32;
    StorageChangeWipeCode = 67 (Ptr, Len, Ptr, Ptr, Len) -> W32;
    StorageHas = 68 (U32) -> W32;
    StorageGet = 69 (U32, Ptr, U32, Ptr) -> W32;
    StorageSet = 70 (U32, Ptr, U32) -> W32;
    StorageDelete = 71 (U32) -> W32;
    StorageSetCounter = 72 (U32, U32) -> W32;
    StorageNextCounter = 73 (U32, Ptr) -> W32;
    StorageWipe = 74 () -> None;

    EntropyGet = 75 (Ptr) -> None;
    RngGet = 76 () -> W32;

    TranslationsWrite = 77 (Ptr, U32, Len) -> W32;
    TranslationsRead = 78 (Ptr, U32) -> Addr;
    TranslationsErase = 79 () -> W32;
    TranslationsAreaBytesize = 80 () -> W32;

    FirmwareGetVendor = 81 (Ptr, Len) -> W32;
    FirmwareHashStart = 82 (Ptr, Len) -> W32;
    FirmwareHashContinue = 83 (Ptr, Len) -> W32;

    OptigaSign = 84 (U32, Ptr, Len, Ptr, Len, Ptr) -> W32;
    OptigaCertSize = 85 (U32, Ptr) -> W32;
    OptigaReadCert = 86 (U32, Ptr, Len, Ptr) -> W32;
    OptigaReadSec = 87 (Ptr) -> W32;
    OptigaRandomBuffer = 88 (Ptr, Len) -> W32;
    OptigaSetSecMax = 89 () -> None;

    ButtonGetEvent = 90 (Ptr) -> W32;
    TouchGetEvent = 91 () -> W32;
    HapticSetEnabled = 92 (U32) -> None;
    HapticGetEnabled = 93 () -> W32;
    HapticTest = 94 (U32) -> W32;
    HapticPlay = 95 (U32) -> W32;
    HapticPlayCustom = 96 (I32, U32) -> W32;
    RgbLedSetColor = 97 (U32) -> None;

    Dma2dWait = 98 () -> None;
    Dma2dRgb565Fill = 99 (Ptr) -> W32;
    Dma2dRgb565CopyMono4 = 100 (Ptr) -> W32;
    Dma2dRgb565CopyRgb565 = 101 (Ptr) -> W32;
    Dma2dRgb565BlendMono4 = 102 (Ptr) -> W32;
    Dma2dRgb565BlendMono8 = 103 (Ptr) -> W32;
    Dma2dRgba8888Fill = 104 (Ptr) -> W32;
    Dma2dRgba8888CopyMono4 = 105 (Ptr) -> W32;
    Dma2dRgba8888CopyRgb565 = 106 (Ptr) -> W32;
    Dma2dRgba8888CopyRgba8888 = 107 (Ptr) -> W32;
    Dma2dRgba8888BlendMono4 = 108 (Ptr) -> W32;
    Dma2dRgba8888BlendMono8 = 109 (Ptr) -> W32;

    BleStart = 110 () -> None;
    BleIssueCommand = 111 (Ptr) -> W32;
    BleGetEvent = 112 (Ptr) -> W32;
    BleGetState = 113 (Ptr) -> None;
    BleCanWrite = 114 () -> W32;
    BleWrite = 115 (Ptr, Len) -> W32;
    BleCanRead = 116 () -> W32;
    BleRead = 117 (Ptr, Len) -> W32;

    PmSuspend = 118 (Ptr) -> W32;
    PmHibernate = 119 () -> W32;
    PmGetState = 120 (Ptr) -> W32;
    PmGetEvents = 121 (Ptr) -> W32;
}

impl Sysnum {
    /// Looks up the descriptor for this syscall.
    #[inline(always)]
    pub fn desc(self) -> &'static SyscallDesc {
        // Dense numbering is checked at compile time below.
        &SYSCALLS[self as usize]
    }
}

const fn table_is_well_formed(table: &[SyscallDesc]) -> bool {
    let mut i = 0;
    while i < table.len() {
        if table[i].nr as usize != i || table[i].slots() > ARG_SLOTS {
            return false;
        }
        i += 1;
    }
    true
}

// A syscall that needs more than six slots, or a gap in the numbering, is an
// ABI break and must not build.
static_assertions::const_assert!(table_is_well_formed(SYSCALLS));

/// A record describing a fault taken by a task.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum FaultInfo {
    /// The task asked the kernel to touch memory it can't reach itself.
    MemoryAccess {
        /// First byte of the offending range. `None` when the range couldn't
        /// even be formed (a length computation overflowed).
        address: Option<usize>,
        /// Origin of the fault.
        source: FaultSource,
    },
    /// Arguments passed to a syscall were invalid.
    SyscallUsage(UsageError),
}

impl From<UsageError> for FaultInfo {
    fn from(e: UsageError) -> Self {
        Self::SyscallUsage(e)
    }
}

/// A kernel-defined fault, arising from how a user task behaved.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum UsageError {
    /// A program used an undefined syscall number.
    BadSyscallNumber,
    /// A slice argument is unaligned for its type or wraps the address space.
    InvalidSlice,
    /// A count multiplied by an element size doesn't fit in 32 bits.
    LengthOverflow,
    /// Input is larger than the fixed kernel buffer that must hold it.
    OversizedInput,
}

/// Origin of a fault.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum FaultSource {
    /// User code did something that was intercepted by the processor.
    User,
    /// User code asked the kernel to do something bad on its behalf.
    Kernel,
}
