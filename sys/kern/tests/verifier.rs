// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Syscall verification, driven through raw traps.

mod common;

use abi::wire::{join_u64, Arg, Ret};
use abi::{
    Bitblt, BleCommand, BleEvent, BleState, BootImage, FaultInfo, FaultSource,
    FbInfo, PmEvents, PmState, PmStatus, SecBool, Sysnum, UsageError,
    UsbClassInfo, EXTERNAL_SALT_SIZE,
};
use common::{Buf, Fixture, Options, FB_HEIGHT, FB_STRIDE};
use kern::drivers::Dma2dOp;
use kern::mpu::{AppletLayout, MpuMode};
use kern::syscalls::Resume;
use kern::task::Termination;
use proptest::prelude::*;
use zerocopy::FromZeros;

fn fault(fx: &Fixture) -> Option<FaultInfo> {
    fx.with_kernel(|k| k.active_task().fault())
}

fn fatal_message(fx: &Fixture) -> Vec<u8> {
    match fx.terminations().as_slice() {
        [Termination::Fatal { message, .. }] => message.to_vec(),
        other => panic!("expected one fatal termination, got {other:?}"),
    }
}

#[test]
fn access_follows_the_applet() {
    let fx = Fixture::new();
    fx.with_kernel(|k| {
        assert!(k.probe_read_access(fx.data.addr, fx.data.len));
        assert!(k.probe_write_access(fx.data.addr, fx.data.len));
        assert!(k.probe_write_access(fx.data.at(100), 1));
        // Code and assets are read-only.
        assert!(k.probe_read_access(fx.code.addr, fx.code.len));
        assert!(!k.probe_write_access(fx.code.addr, 1));
        assert!(k.probe_read_access(fx.assets.addr, fx.assets.len));
        assert!(!k.probe_write_access(fx.assets.addr, 1));
        // One byte too far.
        assert!(!k.probe_read_access(fx.data.addr, fx.data.len + 1));
        assert!(!k.probe_write_access(fx.data.end() - 4, 8));
        // Not the task's.
        assert!(!k.probe_read_access(fx.foreign.addr, 1));
        assert!(!k.probe_read_access(0x2000_0000, 4));
        assert!(!k.probe_read_access(usize::MAX - 3, 8));
        // Empty ranges name no memory.
        assert!(k.probe_read_access(0, 0));
    });
}

#[test]
fn bad_buffer_ends_the_task_before_any_driver_runs() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::UsbHidWrite,
        &[Arg::U32(0), Arg::Ptr(fx.foreign.addr), Arg::Len(16)],
    );
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
    assert_eq!(
        fault(&fx),
        Some(FaultInfo::MemoryAccess {
            address: Some(fx.foreign.addr),
            source: FaultSource::Kernel,
        })
    );
}

#[test]
fn one_byte_past_the_buffer_is_refused() {
    let fx = Fixture::new();
    let n = 64;
    let start = fx.data.end() - (n - 1);
    let r = fx.call(
        Sysnum::FirmwareGetVendor,
        &[Arg::Ptr(start), Arg::Len(n)],
    );
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn output_into_code_is_refused() {
    let fx = Fixture::new();
    let r = fx.call(Sysnum::UnitPropertiesGet, &[Arg::Ptr(fx.code.addr)]);
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn sdcard_count_overflow_is_caught_first() {
    // 2^23 blocks of 512 bytes is exactly 2^32.
    let count = 1 << 23;
    for optional in [true, false] {
        let fx = Fixture::with(Options {
            optional,
            ..Options::default()
        });
        let r = fx.call(
            Sysnum::SdCardReadBlocks,
            &[Arg::Ptr(fx.data.addr), Arg::U32(0), Arg::U32(count)],
        );
        assert_eq!(r, Resume::Terminated);
        assert!(fx.calls().is_empty());
        assert_eq!(
            fault(&fx),
            Some(FaultInfo::SyscallUsage(UsageError::LengthOverflow))
        );
        assert_eq!(fx.terminations().len(), 1);
    }
}

#[test]
fn sdcard_blocks_fill_task_memory() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::SdCardReadBlocks,
        &[Arg::Ptr(fx.data.addr), Arg::U32(7), Arg::U32(2)],
    );
    assert_eq!(Fixture::returned(r), [1, 0]);
    assert_eq!(fx.log.borrow().lengths, vec![1024]);
    assert!(fx.data.get(0, 1024).iter().all(|&b| b == 0x5D));

    // Three blocks don't fit in the data area.
    let r = fx.call(
        Sysnum::SdCardWriteBlocks,
        &[Arg::Ptr(fx.data.addr), Arg::U32(0), Arg::U32(3)],
    );
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fx.calls(), vec!["sd_read"]);
}

#[test]
fn moving_the_applet_moves_access() {
    let fx = Fixture::new();
    let fresh = Buf::alloc(256);
    fx.mpu.set_active_applet(AppletLayout {
        data1: fresh.area(),
        ..AppletLayout::EMPTY
    });

    let r = fx.call(
        Sysnum::FirmwareGetVendor,
        &[Arg::Ptr(fresh.addr), Arg::Len(16)],
    );
    assert_eq!(Fixture::returned(r), [1, 0]);
    assert_eq!(fresh.get(0, 6), b"vendor");

    let r = fx.call(
        Sysnum::FirmwareGetVendor,
        &[Arg::Ptr(fx.data.addr), Arg::Len(16)],
    );
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fatal_message(&fx), b"access violation");
}

#[test]
fn applet_switch_during_a_read_leaves_the_new_applet_alone() {
    let fx = Fixture::new();
    let next = Buf::alloc(256);
    fx.switch_applet_during_next_call(AppletLayout {
        data1: next.area(),
        ..AppletLayout::EMPTY
    });

    let r = fx.call(
        Sysnum::UsbHidReadBlocking,
        &[
            Arg::U32(0),
            Arg::Ptr(fx.data.at(32)),
            Arg::Len(16),
            Arg::I32(-1),
        ],
    );
    assert_eq!(Fixture::returned(r), [16, 0]);
    // The data landed exactly where it was checked, and nowhere else.
    assert_eq!(fx.data.get(32, 16), vec![0xAB; 16]);
    assert_eq!(fx.data.get(0, 32), vec![0; 32]);
    assert_eq!(fx.data.get(48, 16), vec![0; 16]);
    assert_eq!(next.get(0, 256), vec![0; 256]);

    // What follows is checked against the new applet.
    assert!(fx.mpu.can_write(next.addr, next.len));
    assert!(!fx.mpu.can_write(fx.data.addr, 1));
    assert!(fx.terminations().is_empty());
}

#[test]
fn applet_switch_before_a_result_is_stored() {
    let fx = Fixture::new();
    let next = Buf::alloc(256);
    fx.switch_applet_during_next_call(AppletLayout {
        data1: next.area(),
        ..AppletLayout::EMPTY
    });

    let r = fx.call(
        Sysnum::StorageGet,
        &[
            Arg::U32(0x0102),
            Arg::Ptr(fx.data.at(64)),
            Arg::U32(8),
            Arg::Ptr(fx.data.at(128)),
        ],
    );
    assert_eq!(Fixture::returned(r), [SecBool::TRUE.0 as usize, 0]);
    assert_eq!(fx.data.get(64, 5), b"value");
    assert_eq!(fx.data.get_value::<u16>(128), 5);
    assert_eq!(next.get(0, 256), vec![0; 256]);
    assert_eq!(fx.log.borrow().lengths, vec![8]);
}

#[test]
fn error_exit_text_is_bounded() {
    let fx = Fixture::new();
    fx.data.put(0, &[b'T'; 100]);
    fx.data.put(128, b"went wrong\0ignored");
    let r = fx.call(
        Sysnum::SystemExitError,
        &[
            Arg::Ptr(fx.data.addr),
            Arg::Len(100),
            Arg::Ptr(fx.data.at(128)),
            Arg::Len(18),
            Arg::Ptr(0),
            Arg::Len(5),
        ],
    );
    assert_eq!(r, Resume::Terminated);
    match fx.terminations().as_slice() {
        [Termination::Error {
            title,
            message,
            footer,
        }] => {
            assert_eq!(title.len(), 63);
            assert_eq!(&message[..], b"went wrong");
            assert!(footer.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(fault(&fx).is_none());
}

#[test]
fn error_exit_with_unreadable_text_is_a_violation() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::SystemExitFatal,
        &[
            Arg::Ptr(fx.foreign.addr),
            Arg::Len(8),
            Arg::Ptr(0),
            Arg::Len(0),
            Arg::I32(12),
        ],
    );
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fatal_message(&fx), b"access violation");
}

#[test]
fn terminated_task_is_refused_quietly() {
    let fx = Fixture::new();
    assert_eq!(fx.call(Sysnum::SystemExit, &[Arg::I32(3)]), Resume::Terminated);
    assert_eq!(fx.terminations(), vec![Termination::Exit { code: 3 }]);

    assert_eq!(fx.call(Sysnum::RngGet, &[]), Resume::Terminated);
    assert_eq!(fx.call(Sysnum::SystemExit, &[Arg::I32(4)]), Resume::Terminated);
    assert_eq!(fx.raw(1000, &[0; 6]), Resume::Terminated);

    assert!(fx.calls().is_empty());
    assert_eq!(fx.terminations().len(), 1);
    assert!(fault(&fx).is_none());
}

#[test]
fn unknown_numbers_are_invalid_syscalls() {
    for nr in [98, 0x1234, u32::MAX] {
        let fx = Fixture::new();
        assert_eq!(fx.raw(nr, &[0; 6]), Resume::Terminated);
        assert_eq!(fatal_message(&fx), b"invalid syscall");
        assert_eq!(
            fault(&fx),
            Some(FaultInfo::SyscallUsage(UsageError::BadSyscallNumber))
        );
    }
}

#[test]
fn missing_subsystems_look_like_missing_syscalls() {
    let calls: &[(Sysnum, &[Arg])] = &[
        (Sysnum::OptigaSetSecMax, &[]),
        (Sysnum::SdCardPowerOn, &[]),
        (Sysnum::TouchGetEvent, &[]),
        (Sysnum::HapticPlay, &[Arg::U32(1)]),
        (Sysnum::RgbLedSetColor, &[Arg::U32(0xff00ff)]),
        (Sysnum::Dma2dWait, &[]),
        (Sysnum::BleStart, &[]),
        (Sysnum::PmHibernate, &[]),
    ];
    for &(nr, args) in calls {
        let fx = Fixture::with(Options {
            optional: false,
            ..Options::default()
        });
        assert_eq!(fx.call(nr, args), Resume::Terminated, "{nr:?}");
        assert_eq!(fatal_message(&fx), b"invalid syscall");
        assert!(fx.calls().is_empty());
    }
}

#[test]
fn fb_info_grants_the_frame_buffer() {
    let fx = Fixture::new();
    let fb_len = FB_STRIDE * FB_HEIGHT as usize;
    assert!(!fx.mpu.can_write(fx.fb.addr, 1));

    let r = fx.call(Sysnum::DisplayGetFbInfo, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);
    let info: FbInfo = fx.data.get_value(0);
    assert_eq!(info.ptr, fx.fb.addr);
    assert_eq!(info.stride, FB_STRIDE);

    assert!(fx.mpu.inside_active_fb(fx.fb.addr, fb_len));
    assert!(fx.mpu.can_write(fx.fb.addr, fb_len));
    assert!(!fx.mpu.can_write(fx.fb.addr, fb_len + 1));
    assert_eq!(fx.mpu.current_mode(), MpuMode::App);
    fx.mpu.with(|mpu| {
        let hw = mpu.hardware();
        assert!(hw.regions().iter().any(|r| r.base == fx.fb.addr));
    });
}

#[test]
fn fb_info_without_a_display_buffer() {
    let fx = Fixture::with(Options {
        fb: false,
        ..Options::default()
    });
    fx.data.put(0, &[0xff; 32]);
    let r = fx.call(Sysnum::DisplayGetFbInfo, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(fx.data.get_value::<FbInfo>(0), FbInfo::default());
    fx.mpu.with(|mpu| assert_eq!(mpu.active_fb(), None));
}

#[test]
fn fb_info_for_a_buffer_that_cannot_be_mapped() {
    let fx = Fixture::with(Options {
        fb_offset: 16,
        ..Options::default()
    });
    fx.data.put(0, &[0xff; 32]);
    let r = fx.call(Sysnum::DisplayGetFbInfo, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(fx.data.get_value::<FbInfo>(0), FbInfo::default());
    assert!(!fx.mpu.can_write(fx.fb.at(16), 1));
    fx.mpu.with(|mpu| assert_eq!(mpu.active_fb(), None));
}

#[test]
fn rgb565_source_size_must_fit() {
    let fx = Fixture::new();
    fx.data.put_value(
        0,
        Bitblt {
            src_row: fx.data.at(256),
            src_stride: u32::MAX,
            height: 2,
            ..Default::default()
        },
    );
    let r = fx.call(Sysnum::DisplayCopyRgb565, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    assert!(fx.calls().is_empty());
    assert_eq!(
        fault(&fx),
        Some(FaultInfo::SyscallUsage(UsageError::LengthOverflow))
    );
}

#[test]
fn rgb565_source_must_be_readable() {
    let fx = Fixture::new();
    let bb = Bitblt {
        src_row: fx.data.at(256),
        src_stride: 64,
        height: 4,
        ..Default::default()
    };
    fx.data.put_value(0, bb);
    let r = fx.call(Sysnum::DisplayCopyRgb565, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(fx.log.borrow().lengths, vec![256]);

    // The same rectangle starting near the end of the data area.
    fx.data.put_value(
        0,
        Bitblt {
            src_row: fx.data.end() - 255,
            ..bb
        },
    );
    let r = fx.call(Sysnum::DisplayCopyRgb565, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fx.calls(), vec!["copy_rgb565"]);
}

#[test]
fn dma2d_sizes_must_fit() {
    let cases = [
        (Sysnum::Dma2dRgb565Fill, u32::MAX, 0),
        (Sysnum::Dma2dRgba8888CopyRgb565, 64, u32::MAX),
    ];
    for (nr, dst_stride, src_stride) in cases {
        let fx = Fixture::new();
        fx.data.put_value(
            0,
            Bitblt {
                dst_row: fx.data.at(256),
                src_row: fx.code.addr,
                dst_stride,
                src_stride,
                height: 2,
                ..Default::default()
            },
        );
        let r = fx.call(nr, &[Arg::Ptr(fx.data.addr)]);
        assert_eq!(r, Resume::Terminated, "{nr:?}");
        assert!(fx.calls().is_empty());
        assert_eq!(
            fault(&fx),
            Some(FaultInfo::SyscallUsage(UsageError::LengthOverflow))
        );
    }
}

#[test]
fn dma2d_destination_must_be_writable() {
    let fx = Fixture::new();
    fx.data.put_value(
        0,
        Bitblt {
            dst_row: fx.code.addr,
            dst_stride: 64,
            height: 4,
            ..Default::default()
        },
    );
    let r = fx.call(Sysnum::Dma2dRgb565Fill, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn dma2d_source_must_be_readable() {
    let fx = Fixture::new();
    fx.data.put_value(
        0,
        Bitblt {
            dst_row: fx.data.at(256),
            src_row: fx.foreign.addr,
            dst_stride: 64,
            src_stride: 64,
            height: 4,
            ..Default::default()
        },
    );
    let r = fx.call(Sysnum::Dma2dRgb565BlendMono8, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn dma2d_copies_from_code_into_data() {
    let fx = Fixture::new();
    let bb = Bitblt {
        dst_row: fx.data.at(256),
        src_row: fx.code.addr,
        dst_stride: 128,
        src_stride: 64,
        height: 4,
        ..Default::default()
    };
    fx.data.put_value(0, bb);
    let r = fx.call(Sysnum::Dma2dRgba8888CopyRgb565, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);

    // Fills never look at the source, so a foreign one is fine.
    fx.data.put_value(
        0,
        Bitblt {
            src_row: fx.foreign.addr,
            src_stride: u32::MAX,
            ..bb
        },
    );
    let r = fx.call(Sysnum::Dma2dRgba8888Fill, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);

    let r = fx.call(Sysnum::Dma2dWait, &[]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(
        fx.log.borrow().dma2d_ops,
        vec![Dma2dOp::Rgba8888CopyRgb565, Dma2dOp::Rgba8888Fill]
    );
    assert_eq!(fx.calls(), vec!["dma2d_start", "dma2d_start", "dma2d_wait"]);
    assert!(fx.terminations().is_empty());
}

#[test]
fn ble_buffers_are_checked() {
    let fx = Fixture::new();
    let r = fx.call(Sysnum::BleWrite, &[Arg::Ptr(fx.code.addr), Arg::Len(244)]);
    assert_eq!(Fixture::returned(r), [1, 0]);

    let r = fx.call(Sysnum::BleRead, &[Arg::Ptr(fx.data.at(512)), Arg::Len(64)]);
    assert_eq!(Fixture::returned(r), [20, 0]);
    assert!(fx.data.get(512, 20).iter().all(|&b| b == 0xB1));
    assert!(fx.data.get(532, 44).iter().all(|&b| b == 0));
    assert_eq!(fx.log.borrow().lengths, vec![244, 64]);

    let r = fx.call(Sysnum::BleRead, &[Arg::Ptr(fx.code.addr), Arg::Len(64)]);
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fx.calls(), vec!["ble_write", "ble_read"]);
}

#[test]
fn ble_results_reach_the_task() {
    let fx = Fixture::new();
    fx.data.put_value(
        0,
        BleCommand {
            kind: 9,
            data_len: 4,
            data: [0; 32],
        },
    );
    let r = fx.call(Sysnum::BleIssueCommand, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);
    assert_eq!(fx.log.borrow().ble_commands, vec![9]);

    let r = fx.call(Sysnum::BleGetEvent, &[Arg::Ptr(fx.data.at(64))]);
    assert_eq!(Fixture::returned(r), [1, 0]);
    let event: BleEvent = fx.data.get_value(64);
    assert_eq!(event.connection_id, -1);
    assert_eq!(&event.data[..2], &[0xB1, 0xE0]);

    let r = fx.call(Sysnum::BleGetState, &[Arg::Ptr(fx.data.at(128))]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    let state: BleState = fx.data.get_value(128);
    assert_eq!((state.connected, state.peer_count), (1, 2));

    // The code area can be read, not written.
    let r = fx.call(Sysnum::BleGetState, &[Arg::Ptr(fx.code.addr)]);
    assert_eq!(r, Resume::Terminated);
    assert_eq!(
        fx.calls(),
        vec!["ble_issue_command", "ble_event", "ble_state"]
    );
}

#[test]
fn pm_results_reach_the_task() {
    let fx = Fixture::new();
    let r = fx.call(Sysnum::PmSuspend, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [PmStatus::OK.0 as usize, 0]);
    assert_eq!(fx.data.get_value::<u32>(0), 0b100);

    let r = fx.call(Sysnum::PmGetState, &[Arg::Ptr(fx.data.at(32))]);
    assert_eq!(Fixture::returned(r), [PmStatus::OK.0 as usize, 0]);
    let state: PmState = fx.data.get_value(32);
    assert_eq!((state.usb_connected, state.soc), (1, 87));

    // No events: the flags are cleared, not left as they were.
    fx.data.put(64, &[0xFF; 4]);
    let r = fx.call(Sysnum::PmGetEvents, &[Arg::Ptr(fx.data.at(64))]);
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(fx.data.get_value::<PmEvents>(64), PmEvents::default());

    let r = fx.call(Sysnum::PmHibernate, &[]);
    assert_eq!(Fixture::returned(r), [PmStatus::ERROR.0 as usize, 0]);
}

#[test]
fn pm_state_into_code_ends_the_task() {
    let fx = Fixture::new();
    let r = fx.call(Sysnum::PmGetState, &[Arg::Ptr(fx.code.addr)]);
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn boot_image_bytes_are_checked_after_the_header() {
    let fx = Fixture::new();
    let header = |image_ptr, image_size| BootImage {
        image_ptr,
        image_size,
        hash: [0; 32],
    };
    fx.data.put_value(0, header(fx.code.addr, 512));
    let r = fx.call(Sysnum::BootImageCheck, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);

    fx.data.put_value(0, header(fx.foreign.addr, 16));
    let r = fx.call(Sysnum::BootImageReplace, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fx.calls(), vec!["image_check"]);
}

#[test]
fn salts_are_optional() {
    let fx = Fixture::new();
    fx.data.put(0, b"1234");
    fx.data.put(64, &[7; EXTERNAL_SALT_SIZE]);

    let r = fx.call(
        Sysnum::StorageUnlock,
        &[Arg::Ptr(fx.data.addr), Arg::Len(4), Arg::Ptr(0)],
    );
    assert_eq!(Fixture::returned(r)[0] as u32, SecBool::TRUE.0);

    let r = fx.call(
        Sysnum::StorageUnlock,
        &[Arg::Ptr(fx.data.addr), Arg::Len(3), Arg::Ptr(fx.data.at(64))],
    );
    assert_eq!(Fixture::returned(r)[0] as u32, SecBool::FALSE.0);

    let log = fx.log.borrow();
    assert_eq!(log.salts, vec![None, Some([7; EXTERNAL_SALT_SIZE])]);
    assert_eq!(log.pins, vec![b"1234".to_vec(), b"123".to_vec()]);
}

#[test]
fn unreadable_salt_ends_the_task() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::StorageChangePin,
        &[
            Arg::Ptr(fx.data.addr),
            Arg::Len(4),
            Arg::Ptr(fx.data.addr),
            Arg::Len(4),
            Arg::Ptr(0),
            Arg::Ptr(fx.data.end() - 16),
        ],
    );
    assert_eq!(r, Resume::Terminated);
    fx.assert_violation_without_io();
}

#[test]
fn long_pins_are_refused() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::StorageEnsureNotWipeCode,
        &[Arg::Ptr(fx.data.addr), Arg::Len(abi::MAX_PIN_LEN + 1)],
    );
    assert_eq!(r, Resume::Terminated);
    assert!(fx.calls().is_empty());
    assert_eq!(
        fault(&fx),
        Some(FaultInfo::SyscallUsage(UsageError::OversizedInput))
    );
}

#[test]
fn storage_length_query() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::StorageGet,
        &[Arg::U32(0x0101), Arg::Ptr(0), Arg::U32(0), Arg::Ptr(fx.data.addr)],
    );
    assert_eq!(Fixture::returned(r)[0] as u32, SecBool::TRUE.0);
    assert_eq!(fx.data.get_value::<u16>(0), 5);

    let r = fx.call(
        Sysnum::StorageGet,
        &[
            Arg::U32(0x0101),
            Arg::Ptr(fx.data.at(32)),
            Arg::U32(16),
            Arg::Ptr(fx.data.addr),
        ],
    );
    assert_eq!(Fixture::returned(r)[0] as u32, SecBool::TRUE.0);
    assert_eq!(fx.data.get(32, 5), b"value");
}

#[test]
fn wide_values_use_both_registers() {
    let fx = Fixture::new();
    let us = (1u64 << 40) | 5;
    let r = fx.call(Sysnum::SystickUsToCycles, &[Arg::U64(us)]);
    let regs = Fixture::returned(r);
    assert_eq!(join_u64(regs[0] as u32, regs[1] as u32), us * 3);

    let regs = Fixture::returned(fx.call(Sysnum::SystickUs, &[]));
    assert_eq!(
        Ret::raise(abi::RetWidth::W64, regs),
        Ret::W64(u64::from(u32::MAX) + 7)
    );
}

#[test]
fn signing_copies_the_digest_and_reports_the_length() {
    let fx = Fixture::new();
    fx.data.put(0, &[0x33; 32]);
    let r = fx.call(
        Sysnum::OptigaSign,
        &[
            Arg::U32(1),
            Arg::Ptr(fx.data.addr),
            Arg::Len(32),
            Arg::Ptr(fx.data.at(64)),
            Arg::Len(72),
            Arg::Ptr(fx.data.at(160)),
        ],
    );
    assert_eq!(Fixture::returned(r), [0, 0]);
    assert_eq!(fx.data.get_value::<u32>(160), 32);
    assert_eq!(fx.data.get(64, 32), vec![0x33; 32]);

    let r = fx.call(
        Sysnum::OptigaSign,
        &[
            Arg::U32(1),
            Arg::Ptr(fx.data.addr),
            Arg::Len(65),
            Arg::Ptr(fx.data.at(64)),
            Arg::Len(72),
            Arg::Ptr(fx.data.at(160)),
        ],
    );
    assert_eq!(r, Resume::Terminated);
    assert_eq!(
        fault(&fx),
        Some(FaultInfo::SyscallUsage(UsageError::OversizedInput))
    );
}

#[test]
fn usb_descriptor_length_is_bounded() {
    let fx = Fixture::new();
    let mut info = UsbClassInfo::new_zeroed();
    info.report_desc_len = 64;
    fx.data.put_value(0, info);
    let r = fx.call(Sysnum::UsbWebUsbAdd, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(Fixture::returned(r), [1, 0]);

    info.report_desc_len = 65;
    fx.data.put_value(0, info);
    let r = fx.call(Sysnum::UsbHidAdd, &[Arg::Ptr(fx.data.addr)]);
    assert_eq!(r, Resume::Terminated);
    assert_eq!(fx.calls(), vec!["class_add"]);
}

#[test]
fn translations_come_back_as_an_address() {
    let fx = Fixture::new();
    let r = fx.call(
        Sysnum::TranslationsRead,
        &[Arg::Ptr(fx.data.addr), Arg::U32(8)],
    );
    assert_eq!(Fixture::returned(r), [fx.assets.addr + 8, 0]);
    assert_eq!(fx.data.get_value::<u32>(0), 16);
}

#[test]
fn processor_faults_are_reported_once() {
    let fx = Fixture::new();
    let f = FaultInfo::MemoryAccess {
        address: Some(0x2000_0000),
        source: FaultSource::User,
    };
    fx.with_kernel(|k| {
        k.fault_task(f);
        k.fault_task(FaultInfo::SyscallUsage(UsageError::InvalidSlice));
    });
    assert_eq!(fatal_message(&fx), b"access violation");
    assert_eq!(fault(&fx), Some(f));
}

#[test]
fn syscalls_leave_the_task_mode_installed() {
    let fx = Fixture::new();
    fx.call(Sysnum::EntropyGet, &[Arg::Ptr(fx.data.addr)]);
    fx.call(Sysnum::DisplayGetFbInfo, &[Arg::Ptr(fx.data.at(64))]);
    assert_eq!(fx.data.get(0, 44), vec![0x11; 44]);
    assert_eq!(fx.mpu.current_mode(), MpuMode::App);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn writes_succeed_exactly_when_in_bounds(
        offset in 0usize..1200,
        len in 0usize..600,
    ) {
        let fx = Fixture::new();
        // An empty range names no memory, wherever it points.
        let fits = len == 0 || offset + len <= fx.data.len;
        let r = fx.call(
            Sysnum::UsbVcpWrite,
            &[Arg::U32(1), Arg::Ptr(fx.data.addr + offset), Arg::Len(len)],
        );
        if fits {
            prop_assert_eq!(Fixture::returned(r), [len, 0]);
            prop_assert_eq!(fx.calls(), vec!["class_write"]);
        } else {
            prop_assert_eq!(r, Resume::Terminated);
            prop_assert!(fx.calls().is_empty());
            prop_assert_eq!(fx.terminations().len(), 1);
        }
    }
}
