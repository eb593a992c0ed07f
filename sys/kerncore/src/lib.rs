// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-neutral address-range bookkeeping for the kernel.
//!
//! Everything here is plain arithmetic over `usize` addresses, which is what
//! lets it be tested on the host against real buffers.

// Allow std-y things to be used in test. Note that this attribute is a bit of a
// trap for the programmer, because rust-analyzer by default seems to build
// things with test set. This means it's easy to introduce code incompatible
// with no_std without your editor hassling you about it. Beware.
#![cfg_attr(not(test), no_std)]
#![forbid(clippy::wildcard_imports)]

/// Describes types that act as "slices" (in the very abstract sense) referenced
/// by tasks in syscalls.
///
/// This is just a base-length pair; it doesn't let you access the memory.
///
/// # Invariants
///
/// `s.is_empty()` implies `s.base_addr() == s.end_addr()`, and vice versa, and
/// `s.base_addr() <= s.end_addr()` always holds.
pub trait UserSlice {
    /// Checks whether the slice spans zero bytes. Empty slices are opted out of
    /// access checking.
    fn is_empty(&self) -> bool;

    /// The address of the first byte included in this slice.
    fn base_addr(&self) -> usize;

    /// The address of the first byte _not_ included in this slice.
    fn end_addr(&self) -> usize;
}

impl<T: UserSlice> UserSlice for &T {
    #[inline(always)]
    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    #[inline(always)]
    fn base_addr(&self) -> usize {
        (**self).base_addr()
    }

    #[inline(always)]
    fn end_addr(&self) -> usize {
        (**self).end_addr()
    }
}

/// A half-open address range `[base, end)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Span {
    pub base: usize,
    pub end: usize,
}

impl Span {
    pub const EMPTY: Self = Self { base: 0, end: 0 };

    /// Builds a span from a base and a byte count, or `None` if it would run
    /// off the top of the address space.
    pub fn from_base_size(base: usize, size: usize) -> Option<Self> {
        let end = base.checked_add(size)?;
        Some(Self { base, end })
    }

    pub fn is_empty(&self) -> bool {
        self.base == self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.base
    }

    /// Checks that `size` bytes at `addr` lie entirely within this span.
    ///
    /// The end of the range is computed with checked arithmetic, so a `size`
    /// that wraps the address space is never inside anything.
    pub fn contains(&self, addr: usize, size: usize) -> bool {
        addr >= self.base
            && addr
                .checked_add(size)
                .is_some_and(|end| end <= self.end)
    }
}

impl UserSlice for Span {
    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn base_addr(&self) -> usize {
        self.base
    }

    fn end_addr(&self) -> usize {
        self.end
    }
}

/// Returned when a [`SpanSet`] has no room for another disjoint span.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpanSetFull;

/// A fixed-capacity set of addresses, kept as sorted spans with no overlaps
/// and no adjacent neighbors.
///
/// Because touching spans are merged on insertion, any range that isn't
/// inside a single stored span must cover at least one byte outside the set.
/// That makes the access check a single binary search.
#[derive(Clone, Debug)]
pub struct SpanSet<const N: usize> {
    spans: [Span; N],
    len: usize,
}

impl<const N: usize> Default for SpanSet<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SpanSet<N> {
    pub const fn new() -> Self {
        Self {
            spans: [Span::EMPTY; N],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn as_slice(&self) -> &[Span] {
        &self.spans[..self.len]
    }

    /// Adds `span` to the set, absorbing any stored spans it overlaps or
    /// touches. Empty spans are ignored.
    pub fn insert(&mut self, span: Span) -> Result<(), SpanSetFull> {
        if span.is_empty() {
            return Ok(());
        }

        let mut merged = span;
        let mut out = [Span::EMPTY; N];
        let mut n = 0;
        let mut placed = false;

        let mut push = |s: Span, n: &mut usize| {
            if *n == N {
                return Err(SpanSetFull);
            }
            out[*n] = s;
            *n += 1;
            Ok(())
        };

        for &s in self.as_slice() {
            if s.end < merged.base {
                push(s, &mut n)?;
            } else if s.base > merged.end {
                if !placed {
                    push(merged, &mut n)?;
                    placed = true;
                }
                push(s, &mut n)?;
            } else {
                merged.base = merged.base.min(s.base);
                merged.end = merged.end.max(s.end);
            }
        }
        if !placed {
            push(merged, &mut n)?;
        }

        self.spans = out;
        self.len = n;
        Ok(())
    }

    /// Checks whether every byte of `slice` is in the set.
    ///
    /// Empty slices are always accessible; they name no memory.
    pub fn can_access(&self, slice: impl UserSlice) -> bool {
        if slice.is_empty() {
            return true;
        }
        let spans = self.as_slice();
        let i = spans.partition_point(|s| s.base <= slice.base_addr());
        // `i == 0` means every span starts above the slice.
        i != 0 && spans[i - 1].end >= slice.end_addr()
    }
}
