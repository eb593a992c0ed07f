// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static trace buffers for the kernel.
//!
//! A ring buffer is a fixed array of entries, each recording the source line
//! that produced it, a generation number that bumps every time the buffer
//! wraps, a repeat count, and a payload. Consecutive identical entries from
//! the same line are folded into one entry with a higher count, so a tight
//! loop doesn't wipe out history.
//!
//! Buffers are declared with [`ringbuf!`] and written with
//! [`ringbuf_entry!`]:
//!
//! ```ignore
//! #[derive(Copy, Clone, PartialEq)]
//! enum Trace { None, Switched(u8) }
//!
//! ringbuf!(Trace, 32, Trace::None);
//!
//! ringbuf_entry!(Trace::Switched(3));
//! ```
//!
//! Entries may be added from thread mode or from interrupt handlers; each
//! write happens inside a `critical_section`, so an interrupt can never see
//! half an entry. The buffers are meant to be read out with a debugger, or
//! with [`Ringbuf::entries`] in tests.
//!
//! ## Constraints
//!
//! The payload type must implement both `Copy` and `PartialEq`.
//!
//! If you leave the buffer name implicit, you can only have one per module.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

#[doc(hidden)]
pub use critical_section;

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`, with room
/// for `N` entries of type `Type`, all initialized to `expr`. If you omit the
/// name, it defaults to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::RingbufCell<$t, $n> =
            $crate::RingbufCell::new($init);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Inserts data into a ringbuffer declared with [`ringbuf!`].
///
/// `ringbuf_entry!(NAME, expr)` inserts `expr` into `NAME`; without a name
/// it uses `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both in one tuple so neither can see the other's binding.
        let (p, buf) = ($payload, &$buf);
        $crate::RingbufCell::entry(buf, line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// One recorded event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u16,
    pub payload: T,
}

/// The buffer itself. Usually reached through a [`RingbufCell`].
#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    last: Option<usize>,
    buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        if let Some(ent) = self.last.and_then(|i| self.buffer.get_mut(i)) {
            if ent.line == line && ent.payload == payload {
                if let Some(count) = ent.count.checked_add(1) {
                    ent.count = count;
                    return;
                }
            }
        }

        // Avoid `%`; most of our targets have no hardware divide.
        let ndx = match self.last {
            Some(i) if i + 1 < N => i + 1,
            _ => 0,
        };

        let generation = self.buffer[ndx].generation.wrapping_add(1);
        self.buffer[ndx] = RingbufEntry {
            line,
            generation,
            count: 1,
            payload,
        };
        self.last = Some(ndx);
    }

    /// Iterates over recorded entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &RingbufEntry<T>> {
        let start = match self.last {
            Some(i) => i + 1,
            None => N,
        };
        self.buffer[start.min(N)..]
            .iter()
            .chain(&self.buffer[..start.min(N)])
            .filter(|e| e.count != 0)
    }
}

/// A [`Ringbuf`] that can live in a `static` and be written from any
/// context.
pub struct RingbufCell<T: Copy + PartialEq, const N: usize> {
    inner: critical_section::Mutex<RefCell<Ringbuf<T, N>>>,
}

impl<T: Copy + PartialEq, const N: usize> RingbufCell<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            inner: critical_section::Mutex::new(RefCell::new(Ringbuf::new(
                init,
            ))),
        }
    }

    pub fn entry(&self, line: u16, payload: T) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).entry(line, payload);
        });
    }

    /// Runs `body` with shared access to the buffer contents.
    pub fn inspect<R>(&self, body: impl FnOnce(&Ringbuf<T, N>) -> R) -> R {
        critical_section::with(|cs| body(&self.inner.borrow_ref(cs)))
    }
}
