// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support for safely interacting with untrusted/unprivileged/user memory.
//!
//! Every pointer a task passes in is an allegation. [`UserMem`] checks each
//! one against the probe tables kept by the MPU controller before the kernel
//! reads or writes through it, and refuses anything that isn't entirely
//! inside the task's own memory. Structures are copied into kernel locals
//! before use, and results are copied back out only after the work is done,
//! so the task can't change an argument between check and use.

use core::marker::PhantomData;
use core::mem::size_of;

use abi::UsageError;
use arrayvec::ArrayVec;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::err::UserError;
use crate::mpu::MpuCell;
use crate::task::{bounded_text, Text};

/// A (user, untrusted, unprivileged) slice.
///
/// A `USlice` is passed into the kernel by a task, and is intended to refer to
/// memory that task controls -- for instance, a buffer the kernel should fill
/// with data read from USB. However, the `USlice` type itself simply
/// represents an _allegation_ from the task that a section of address space is
/// suitable; it does _not_ demonstrate that the task has access to that memory.
/// It could point into the kernel, to peripherals, etc.
///
/// Having a `USlice<T>` tells you the following:
///
/// - Some task has claimed it has access to a section of address space
///   (delimited by the `USlice`).
/// - The base of the section is correctly aligned for type `T`.
/// - The section does not wrap around the end of the address space.
///
/// To actually access the memory referred to by a `USlice`, go through
/// [`UserMem`], which probes it against the current protection tables first.
pub struct USlice<T> {
    /// Base address of the slice.
    base_address: usize,
    /// Number of `T` elements in the slice.
    length: usize,
    /// since we don't actually use T...
    _marker: PhantomData<*mut [T]>,
}

impl<T> USlice<T> {
    /// Constructs a `USlice` given a base address and length passed from
    /// untrusted code.
    ///
    /// This will only succeed if such a slice would not overlap or touch the
    /// top of the address space, and if `base_address` is correctly aligned for
    /// `T`.
    ///
    /// This method will categorically reject zero-sized T.
    pub fn from_raw(
        base_address: usize,
        length: usize,
    ) -> Result<Self, UsageError> {
        // NOTE: the properties checked here are critical for the correctness of
        // this type. Think carefully before loosening any of them, or adding a
        // second way to construct a USlice.

        // ZST check, should resolve at compile time:
        uassert!(core::mem::size_of::<T>() != 0);

        // Alignment check:
        if base_address % core::mem::align_of::<T>() != 0 {
            return Err(UsageError::InvalidSlice);
        }
        // Check that a slice of `length` `T`s can even exist starting at
        // `base_address`, without wrapping around.
        let size_in_bytes = length
            .checked_mul(core::mem::size_of::<T>())
            .ok_or(UsageError::InvalidSlice)?;
        // Note: this subtraction cannot underflow. You can subtract any usize
        // from usize::MAX.
        let highest_possible_base = usize::MAX - size_in_bytes;
        if base_address <= highest_possible_base {
            Ok(Self {
                base_address,
                length,
                _marker: PhantomData,
            })
        } else {
            Err(UsageError::InvalidSlice)
        }
    }

    /// Constructs an empty `USlice`.
    ///
    /// This ensures that the base address is not zero and is properly aligned,
    /// despite the length being zero, so that it's safe to turn into an empty
    /// slice.
    pub fn empty() -> Self {
        Self {
            base_address: core::ptr::NonNull::<T>::dangling().as_ptr() as usize,
            length: 0,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if this slice is zero-length, `false` otherwise.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the number of `T`s in this slice.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns the bottom address of this slice as a `usize`.
    pub fn base_addr(&self) -> usize {
        self.base_address
    }

    /// Returns the end address of the slice, which is the address one past its
    /// final byte -- or its base address if it's empty.
    pub fn end_addr(&self) -> usize {
        // Compute the size using an unchecked multiplication. Why can we do
        // this? Because we checked that this multiplication does not overflow
        // at construction above. Using an unchecked multiply here removes some
        // instructions.
        let size_in_bytes = self.length.wrapping_mul(core::mem::size_of::<T>());
        self.base_address.wrapping_add(size_in_bytes)
    }
}

impl<T> USlice<T>
where
    T: FromBytes + Immutable + KnownLayout,
{
    /// Converts this into an _actual_ slice that can be directly read by the
    /// kernel.
    ///
    /// # Safety
    ///
    /// This operation is totally unchecked, so to use it safely, you must first
    /// convince yourself of the following.
    ///
    /// 1. That the memory region this `USlice` describes is actual memory.
    /// 2. That this memory is legally readable by the task.
    /// 3. That it does not alias any slice you intend to `&mut`-reference with
    ///    `assume_writable`, or any kernel memory.
    /// 4. That the chosen lifetime `'u` ends before the task can run again.
    pub unsafe fn assume_readable<'u>(self) -> &'u [T] {
        // Safety: this function's contract ensures that the slice we produce
        // here is valid.
        unsafe {
            core::slice::from_raw_parts(
                self.base_address as *const T,
                self.length,
            )
        }
    }

    /// Converts this into an _actual_ slice that can be directly read and
    /// written by the kernel.
    ///
    /// # Safety
    ///
    /// As for [`assume_readable`](Self::assume_readable), except that the
    /// memory must be writable by the task and must not alias any other slice
    /// you intend to access.
    pub unsafe fn assume_writable<'u>(self) -> &'u mut [T] {
        // Safety: this function's contract ensures that the slice we produce
        // here is valid.
        unsafe {
            core::slice::from_raw_parts_mut(
                self.base_address as *mut T,
                self.length,
            )
        }
    }
}

impl<T> Clone for USlice<T> {
    fn clone(&self) -> Self {
        Self {
            base_address: self.base_address,
            length: self.length,
            _marker: PhantomData,
        }
    }
}

/// Can't `derive(Debug)` for `USlice` because that puts a `Debug` requirement
/// on `T`, and that's silly.
impl<T> core::fmt::Debug for USlice<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("USlice")
            .field("base_address", &self.base_address)
            .field("length", &self.length)
            .finish()
    }
}

/// Compatibility with the generic portable algorithms in `kerncore`.
impl<T> kerncore::UserSlice for USlice<T> {
    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn base_addr(&self) -> usize {
        self.base_addr()
    }

    fn end_addr(&self) -> usize {
        self.end_addr()
    }
}

/// The task's memory, as seen from inside a syscall.
///
/// Reading hands out shared borrows; writing takes `&mut self`, so at most
/// one mutable view of task memory exists at a time and it can never overlap
/// a shared one the kernel is still holding.
pub struct UserMem<'a> {
    mpu: &'a MpuCell,
}

impl<'a> UserMem<'a> {
    pub fn new(mpu: &'a MpuCell) -> Self {
        Self { mpu }
    }

    /// The region controller the probes are answered from.
    pub fn mpu(&self) -> &'a MpuCell {
        self.mpu
    }

    /// Checks whether the task could read all of `[ptr, ptr + len)`.
    pub fn can_read(&self, ptr: usize, len: usize) -> bool {
        self.mpu.can_read(ptr, len)
    }

    /// Checks whether the task could write all of `[ptr, ptr + len)`.
    pub fn can_write(&self, ptr: usize, len: usize) -> bool {
        self.mpu.can_write(ptr, len)
    }

    /// Checks `[ptr, ptr + len)` for reading without borrowing it. For
    /// memory a device will reach by address on its own.
    pub fn check_read(&self, ptr: usize, len: usize) -> Result<(), UserError> {
        self.readable(ptr, len).map(drop)
    }

    /// Write counterpart of [`check_read`](Self::check_read).
    pub fn check_write(&self, ptr: usize, len: usize) -> Result<(), UserError> {
        self.writable(ptr, len).map(drop)
    }

    fn readable(&self, ptr: usize, len: usize) -> Result<USlice<u8>, UserError> {
        let slice = USlice::from_raw(ptr, len)?;
        if !self.mpu.can_read_slice(&slice) {
            return Err(UserError::access(ptr));
        }
        // Zero-length views never dereference the pointer, which may be null.
        Ok(if slice.is_empty() { USlice::empty() } else { slice })
    }

    fn writable(&self, ptr: usize, len: usize) -> Result<USlice<u8>, UserError> {
        let slice = USlice::from_raw(ptr, len)?;
        if !self.mpu.can_write_slice(&slice) {
            return Err(UserError::access(ptr));
        }
        Ok(if slice.is_empty() { USlice::empty() } else { slice })
    }

    /// Borrows `len` bytes of task memory for reading.
    pub fn read(&self, ptr: usize, len: usize) -> Result<&[u8], UserError> {
        let slice = self.readable(ptr, len)?;
        // Safety: the probe shows this is task memory the task may read,
        // hence real memory and not the kernel's. No mutable view exists
        // while `self` is shared, and the borrow ends with the syscall.
        Ok(unsafe { slice.assume_readable() })
    }

    /// Borrows `len` bytes of task memory for writing.
    pub fn write(
        &mut self,
        ptr: usize,
        len: usize,
    ) -> Result<&mut [u8], UserError> {
        let slice = self.writable(ptr, len)?;
        // Safety: as for `read`, and `&mut self` rules out any other view.
        Ok(unsafe { slice.assume_writable() })
    }

    /// Copies a structure in from task memory.
    pub fn copy_in<T>(&self, ptr: usize) -> Result<T, UserError>
    where
        T: FromBytes + KnownLayout + Immutable,
    {
        let bytes = self.read(ptr, size_of::<T>())?;
        T::read_from_bytes(bytes)
            .map_err(|_| UsageError::InvalidSlice.into())
    }

    /// Like [`copy_in`](Self::copy_in), but a null pointer means "absent".
    pub fn copy_in_opt<T>(&self, ptr: usize) -> Result<Option<T>, UserError>
    where
        T: FromBytes + KnownLayout + Immutable,
    {
        if ptr == 0 {
            Ok(None)
        } else {
            self.copy_in(ptr).map(Some)
        }
    }

    /// Copies a variable-length input into a fixed kernel buffer. Input that
    /// doesn't fit is refused before the probe.
    pub fn copy_in_bytes<const N: usize>(
        &self,
        ptr: usize,
        len: usize,
    ) -> Result<ArrayVec<u8, N>, UserError> {
        if len > N {
            return Err(UsageError::OversizedInput.into());
        }
        let mut buf = ArrayVec::new();
        buf.try_extend_from_slice(self.read(ptr, len)?)
            .map_err(|_| UsageError::OversizedInput)?;
        Ok(buf)
    }

    /// Copies in text for an exit screen.
    ///
    /// A null pointer is an empty string. Otherwise the whole claimed length
    /// must be readable, but only the first `EXIT_TEXT_CAPACITY - 1` bytes,
    /// up to any NUL, are kept.
    pub fn text(&self, ptr: usize, len: usize) -> Result<Text, UserError> {
        if ptr == 0 {
            return Ok(Text::new());
        }
        Ok(bounded_text(self.read(ptr, len)?))
    }

    /// Reserves a place to store a result of type `T` once the work is done.
    pub fn out<T>(&self, ptr: usize) -> Result<UOut<T>, UserError>
    where
        T: IntoBytes + Immutable,
    {
        self.writable(ptr, size_of::<T>())?;
        Ok(UOut {
            address: ptr,
            _marker: PhantomData,
        })
    }
}

/// A probed destination for one `T` in task memory.
///
/// Produced by [`UserMem::out`]. Verifiers compute results into kernel
/// locals and store them here as the last step, after any borrow of task
/// memory has ended.
#[must_use]
pub struct UOut<T> {
    address: usize,
    _marker: PhantomData<fn(T)>,
}

impl<T: IntoBytes + Immutable> UOut<T> {
    pub fn store(self, value: T) {
        let bytes = value.as_bytes();
        // Safety: `address` passed a write probe for exactly this many bytes
        // when `self` was made. The write is unaligned-safe and bytewise.
        unsafe {
            core::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.address as *mut u8,
                bytes.len(),
            );
        }
    }
}
