// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed-layout structures passed across the boundary by pointer.
//!
//! Types the kernel only reads derive `FromBytes`; types the kernel writes
//! back to the caller also derive `IntoBytes`, which requires that they have
//! no padding on either 32- or 64-bit targets.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Hardened boolean used by the storage and secure-element interfaces.
///
/// A single bit flip can't turn `FALSE` into `TRUE`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SecBool(pub u32);

impl SecBool {
    pub const TRUE: Self = Self(0xAAAA_AAAA);
    pub const FALSE: Self = Self(0);

    pub fn is_true(self) -> bool {
        self == Self::TRUE
    }
}

impl From<bool> for SecBool {
    fn from(b: bool) -> Self {
        if b {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }
}

/// Set of event sources, one bit per source.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct SysEvents {
    pub read_ready: u32,
    pub write_ready: u32,
}

/// Where the frame buffer lives and how it's laid out.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct FbInfo {
    pub ptr: usize,
    pub stride: usize,
    pub width: u32,
    pub height: u32,
}

/// A rectangle fill, copy or blend.
///
/// For the display calls only `src_row` points into caller memory, and the
/// destination is the display's own buffer. DMA2D calls write through
/// `dst_row` too, so both rows are caller memory there.
#[derive(Copy, Clone, Debug, Default, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Bitblt {
    pub dst_row: usize,
    pub src_row: usize,
    pub dst_stride: u32,
    pub src_stride: u32,
    pub width: u16,
    pub height: u16,
    pub dst_x: u16,
    pub dst_y: u16,
    pub src_x: u16,
    pub src_y: u16,
    pub src_fg: u32,
    pub src_bg: u32,
    pub src_alpha: u8,
}

/// A firmware image staged in caller memory.
#[derive(Copy, Clone, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BootImage {
    pub image_ptr: usize,
    pub image_size: u32,
    pub hash: [u8; 32],
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct UsbState {
    pub configured: u32,
}

/// USB device identity. Strings are inline and NUL-padded.
#[derive(Copy, Clone, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UsbDevInfo {
    pub device_class: u8,
    pub device_subclass: u8,
    pub device_protocol: u8,
    pub usb21_enabled: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub release_num: u16,
    pub manufacturer: [u8; 32],
    pub product: [u8; 32],
    pub serial_number: [u8; 48],
    pub interface: [u8; 32],
}

/// Interface configuration for a HID, VCP or WebUSB class.
///
/// The report descriptor is carried inline so the kernel never has to keep
/// a pointer into task memory.
#[derive(Copy, Clone, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UsbClassInfo {
    pub iface_num: u8,
    pub data_iface_num: u8,
    pub ep_in: u8,
    pub ep_out: u8,
    pub ep_cmd: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub polling_interval: u8,
    pub max_packet_len: u16,
    pub report_desc_len: u16,
    pub report_desc: [u8; 64],
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct UnitProperties {
    pub color: u32,
    pub packaging: u32,
    pub btconly: u32,
    pub locked: u32,
    pub sd_hotswap_enabled: u32,
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct ButtonEvent {
    pub button: u32,
    pub kind: u32,
}

/// A request for the Bluetooth co-processor. The payload is inline.
#[derive(Copy, Clone, Debug, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct BleCommand {
    pub kind: u32,
    pub data_len: u32,
    pub data: [u8; 32],
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct BleEvent {
    pub kind: u32,
    pub connection_id: i32,
    pub data_len: u32,
    pub data: [u8; 8],
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct BleState {
    pub connected: u32,
    pub peer_count: u32,
    pub connectable: u32,
    pub pairing: u32,
    pub pairing_requested: u32,
    pub state_known: u32,
}

/// Result of a power-manager request. Zero is success.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PmStatus(pub u32);

impl PmStatus {
    pub const OK: Self = Self(0);
    pub const ERROR: Self = Self(1);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct PmState {
    pub usb_connected: u32,
    pub wireless_connected: u32,
    pub charging: u32,
    pub power_status: u32,
    /// State of charge, in percent.
    pub soc: u32,
}

/// Power events since the last query, one bit per event.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout,
)]
#[repr(C)]
pub struct PmEvents {
    pub flags: u32,
}
