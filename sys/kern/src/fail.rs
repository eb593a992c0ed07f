// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recording kernel failures where a debugger can find them.
//!
//! - `KERNEL_HAS_FAILED` is a `bool`, false until the kernel reaches [`die`]
//!   (directly or through a `panic!`).
//! - `KERNEL_EPITAPH` holds as much of the failure reason as fits, as UTF-8,
//!   padded with NULs.
//!
//! A kernel failure is not a task termination: there is no error screen and
//! no platform hook, because the code that would draw one can no longer be
//! trusted. The processor just stops.

use core::fmt::{Display, Write};
use core::sync::atomic::{AtomicBool, Ordering};

/// Set by all failure reporting paths.
#[used]
static KERNEL_HAS_FAILED: AtomicBool = AtomicBool::new(false);

const EPITAPH_LEN: usize = 128;

#[used]
static mut KERNEL_EPITAPH: [u8; EPITAPH_LEN] = [0; EPITAPH_LEN];

fn begin_epitaph() -> &'static mut [u8; EPITAPH_LEN] {
    if KERNEL_HAS_FAILED.swap(true, Ordering::SeqCst) {
        // Failing while failing. Anything more we do risks making it worse.
        halt();
    }
    // Safety: only the first caller gets past the flag above, so this is the
    // only reference ever made.
    unsafe { &mut *core::ptr::addr_of_mut!(KERNEL_EPITAPH) }
}

#[inline(always)]
pub fn die(msg: impl Display) -> ! {
    die_impl(&msg)
}

#[inline(never)]
fn die_impl(msg: &dyn Display) -> ! {
    let mut writer = Eulogist {
        dest: begin_epitaph(),
    };
    write!(writer, "{msg}").ok();
    halt()
}

fn halt() -> ! {
    loop {
        core::sync::atomic::fence(Ordering::SeqCst);
    }
}

/// Writes into the epitaph, dropping whatever doesn't fit.
struct Eulogist {
    dest: &'static mut [u8],
}

impl Write for Eulogist {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let s = s.as_bytes();
        let n = s.len().min(self.dest.len());
        let (dest, leftovers) = core::mem::take(&mut self.dest).split_at_mut(n);
        dest.copy_from_slice(&s[..n]);
        self.dest = leftovers;
        Ok(())
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    die(info)
}
