// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lowering between typed syscall values and the register convention.
//!
//! Stubs describe their arguments as [`Arg`]s and the kernel hands back a
//! [`Ret`]; neither side shifts or masks register values by hand. The layout
//! of each call comes from its [`SyscallDesc`], so 64-bit values are always
//! split the same way: low word in the first slot, high word in the next.

use crate::{
    ArgKind, PmStatus, RetWidth, SecBool, SyscallDesc, ARG_SLOTS, RET_SLOTS,
};

/// Register contents for one trap.
pub type Slots = [usize; ARG_SLOTS];

/// Return registers for one trap.
pub type RetSlots = [usize; RET_SLOTS];

/// One typed syscall argument.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Arg {
    U32(u32),
    I32(i32),
    Ptr(usize),
    Len(usize),
    U64(u64),
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Arg::U32(_) => ArgKind::U32,
            Arg::I32(_) => ArgKind::I32,
            Arg::Ptr(_) => ArgKind::Ptr,
            Arg::Len(_) => ArgKind::Len,
            Arg::U64(_) => ArgKind::U64,
        }
    }

    /// Shorthand for passing a shared buffer: its address and length.
    pub fn buf(b: &[u8]) -> [Arg; 2] {
        [Arg::Ptr(b.as_ptr() as usize), Arg::Len(b.len())]
    }

    /// Shorthand for passing a buffer the kernel will write to.
    pub fn buf_mut(b: &mut [u8]) -> [Arg; 2] {
        [Arg::Ptr(b.as_mut_ptr() as usize), Arg::Len(b.len())]
    }

    /// Address of a value, or null for `None`.
    pub fn opt_ref<T>(v: Option<&T>) -> Arg {
        Arg::Ptr(v.map_or(0, |r| r as *const T as usize))
    }
}

/// Splits a 64-bit value into `(low, high)` 32-bit halves.
pub const fn split_u64(v: u64) -> (u32, u32) {
    (v as u32, (v >> 32) as u32)
}

/// Inverse of [`split_u64`].
pub const fn join_u64(low: u32, high: u32) -> u64 {
    (low as u64) | (high as u64) << 32
}

/// Packs `args` into registers according to `desc`.
///
/// # Panics
///
/// If `args` doesn't match the descriptor. Stubs are written against the
/// table, so this only fires on a bug in the stub itself.
pub fn lower(desc: &SyscallDesc, args: &[Arg]) -> Slots {
    assert_eq!(args.len(), desc.args.len(), "{:?}: arity", desc.nr);

    let mut slots = [0; ARG_SLOTS];
    let mut next = 0;
    for (arg, &kind) in args.iter().zip(desc.args) {
        assert_eq!(arg.kind(), kind, "{:?}: argument kind", desc.nr);
        match *arg {
            Arg::U32(v) => slots[next] = v as usize,
            Arg::I32(v) => slots[next] = v as u32 as usize,
            Arg::Ptr(v) | Arg::Len(v) => slots[next] = v,
            Arg::U64(v) => {
                let (low, high) = split_u64(v);
                slots[next] = low as usize;
                slots[next + 1] = high as usize;
            }
        }
        next += kind.slots();
    }
    slots
}

/// Kernel-side view of a trap's argument registers.
///
/// Arguments are fetched by position in the descriptor, not by register, so
/// a `U64` in the middle of the list shifts everything after it
/// automatically.
#[derive(Copy, Clone)]
pub struct Args<'a> {
    desc: &'static SyscallDesc,
    slots: &'a Slots,
}

impl<'a> Args<'a> {
    pub fn new(desc: &'static SyscallDesc, slots: &'a Slots) -> Self {
        Self { desc, slots }
    }

    pub fn desc(&self) -> &'static SyscallDesc {
        self.desc
    }

    fn slot(&self, index: usize, kind: ArgKind) -> usize {
        debug_assert_eq!(self.desc.args[index], kind);
        self.slots[self.desc.slot_of(index)]
    }

    pub fn u32(&self, index: usize) -> u32 {
        self.slot(index, ArgKind::U32) as u32
    }

    /// Low byte of a `U32` argument.
    pub fn u8(&self, index: usize) -> u8 {
        self.u32(index) as u8
    }

    /// Low half of a `U32` argument.
    pub fn u16(&self, index: usize) -> u16 {
        self.u32(index) as u16
    }

    pub fn i32(&self, index: usize) -> i32 {
        self.slot(index, ArgKind::I32) as u32 as i32
    }

    pub fn ptr(&self, index: usize) -> usize {
        self.slot(index, ArgKind::Ptr)
    }

    pub fn len(&self, index: usize) -> usize {
        self.slot(index, ArgKind::Len)
    }

    pub fn u64(&self, index: usize) -> u64 {
        debug_assert_eq!(self.desc.args[index], ArgKind::U64);
        let slot = self.desc.slot_of(index);
        join_u64(self.slots[slot] as u32, self.slots[slot + 1] as u32)
    }
}

/// A typed syscall result.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Ret {
    None,
    W32(u32),
    W64(u64),
    Addr(usize),
}

impl Ret {
    pub fn width(&self) -> RetWidth {
        match self {
            Ret::None => RetWidth::None,
            Ret::W32(_) => RetWidth::W32,
            Ret::W64(_) => RetWidth::W64,
            Ret::Addr(_) => RetWidth::Addr,
        }
    }

    /// Places this value into return registers.
    pub fn lower(self) -> RetSlots {
        match self {
            Ret::None => [0, 0],
            Ret::W32(v) => [v as usize, 0],
            Ret::W64(v) => {
                let (low, high) = split_u64(v);
                [low as usize, high as usize]
            }
            Ret::Addr(v) => [v, 0],
        }
    }

    /// Reads return registers as the width the descriptor promises.
    pub fn raise(width: RetWidth, regs: RetSlots) -> Self {
        match width {
            RetWidth::None => Ret::None,
            RetWidth::W32 => Ret::W32(regs[0] as u32),
            RetWidth::W64 => Ret::W64(join_u64(regs[0] as u32, regs[1] as u32)),
            RetWidth::Addr => Ret::Addr(regs[0]),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Ret::W32(v) => v,
            Ret::W64(v) => v as u32,
            Ret::Addr(v) => v as u32,
            Ret::None => 0,
        }
    }

    pub fn as_i32(self) -> i32 {
        self.as_u32() as i32
    }

    pub fn as_u64(self) -> u64 {
        match self {
            Ret::W64(v) => v,
            other => u64::from(other.as_u32()),
        }
    }

    pub fn as_bool(self) -> bool {
        self.as_u32() != 0
    }

    pub fn as_addr(self) -> usize {
        match self {
            Ret::Addr(v) => v,
            other => other.as_u32() as usize,
        }
    }

    pub fn as_secbool(self) -> SecBool {
        SecBool(self.as_u32())
    }

    pub fn as_pm_status(self) -> PmStatus {
        PmStatus(self.as_u32())
    }
}

impl From<bool> for Ret {
    fn from(b: bool) -> Self {
        Ret::W32(u32::from(b))
    }
}

impl From<u32> for Ret {
    fn from(v: u32) -> Self {
        Ret::W32(v)
    }
}

impl From<i32> for Ret {
    fn from(v: i32) -> Self {
        Ret::W32(v as u32)
    }
}

impl From<u64> for Ret {
    fn from(v: u64) -> Self {
        Ret::W64(v)
    }
}

impl From<SecBool> for Ret {
    fn from(v: SecBool) -> Self {
        Ret::W32(v.0)
    }
}

impl From<PmStatus> for Ret {
    fn from(v: PmStatus) -> Self {
        Ret::W32(v.0)
    }
}

impl From<()> for Ret {
    fn from(_: ()) -> Self {
        Ret::None
    }
}
