//! Typed `Address`/`Offset`/`UWord` values (L).
//!
//! `Address` is always an *offset from the arena's base*, never a host
//! pointer — the whole heap can be grown, copied or relocated without any
//! `unsafe` pointer juggling outside of [`crate::memory::raw`]'s word
//! accessors. Address comparisons are unsigned; offset arithmetic is
//! signed, matching spec's distinction between the two.

use std::fmt;
use std::ops::{Add, Sub};

/// Machine word size in bytes this crate is built for.
///
/// A 32-bit object layout (`WORD_BYTES = 4`) is a documented alternate
/// configuration of the header/offset encoding in [`crate::object::header`]
/// but is not built out as a second compiled path; spec.md treats the
/// word width as a compile-time choice, not a dual-runtime requirement.
pub const WORD_BYTES: usize = 8;

/// Bit width of a machine word.
pub const WORD_BITS: u32 = (WORD_BYTES * 8) as u32;

/// A raw, untyped machine word — the contents of a header slot, a length
/// word, or a field value. Distinct from [`Address`]: a `UWord` carries no
/// claim about what it points at.
pub type UWord = u64;

/// A byte offset from the arena's base address. Never a host pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    /// The address at arena offset zero.
    pub const ZERO: Address = Address(0);

    #[inline]
    pub const fn new(byte_offset: usize) -> Self {
        Address(byte_offset)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Word index of this address relative to the arena base.
    #[inline]
    pub const fn word_index(self) -> usize {
        self.0 / WORD_BYTES
    }

    #[inline]
    pub const fn is_word_aligned(self) -> bool {
        self.0 % WORD_BYTES == 0
    }

    /// `self + off`. Panics on underflow (an offset taking an address
    /// below the arena base is always a bug).
    #[inline]
    pub fn add(self, off: Offset) -> Address {
        let v = self.0 as isize + off.0;
        debug_assert!(v >= 0, "address arithmetic underflowed below arena base");
        Address(v as usize)
    }

    #[inline]
    pub fn sub(self, off: Offset) -> Address {
        self.add(Offset(-off.0))
    }

    /// Signed byte distance `self - other`.
    #[inline]
    pub fn diff(self, other: Address) -> Offset {
        Offset(self.0 as isize - other.0 as isize)
    }

    /// Unsigned "strictly higher than" comparison.
    #[inline]
    pub fn hi(self, other: Address) -> bool {
        self.0 > other.0
    }

    /// Unsigned "lower than or equal to" comparison.
    #[inline]
    pub fn loeq(self, other: Address) -> bool {
        self.0 <= other.0
    }

    #[inline]
    pub fn round_up_to_word(self) -> Address {
        Address(crate::util::alignment::round_up_to_word(self.0))
    }

    #[inline]
    pub fn round_down_to_word(self) -> Address {
        Address(crate::util::alignment::round_down_to_word(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl Add<Offset> for Address {
    type Output = Address;
    #[inline]
    fn add(self, rhs: Offset) -> Address {
        Address::add(self, rhs)
    }
}

impl Sub<Offset> for Address {
    type Output = Address;
    #[inline]
    fn sub(self, rhs: Offset) -> Address {
        Address::sub(self, rhs)
    }
}

/// A signed byte (or word, via [`Offset::to_words`]) displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(isize);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    #[inline]
    pub const fn from_bytes(bytes: isize) -> Self {
        Offset(bytes)
    }

    #[inline]
    pub const fn from_words(words: isize) -> Self {
        Offset(words * WORD_BYTES as isize)
    }

    #[inline]
    pub const fn as_bytes(self) -> isize {
        self.0
    }

    /// Scale this byte offset down to a word count. The offset must
    /// already be a whole number of words.
    #[inline]
    pub fn to_words(self) -> isize {
        debug_assert_eq!(self.0 % WORD_BYTES as isize, 0, "offset is not word-sized");
        self.0 / WORD_BYTES as isize
    }
}

impl Add for Offset {
    type Output = Offset;
    #[inline]
    fn add(self, rhs: Offset) -> Offset {
        Offset(self.0 + rhs.0)
    }
}

impl Sub for Offset {
    type Output = Offset;
    #[inline]
    fn sub(self, rhs: Offset) -> Offset {
        Offset(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Address arithmetic ===

    #[test]
    fn add_and_sub_are_inverses() {
        let a = Address::new(100);
        let off = Offset::from_bytes(24);
        assert_eq!(a.add(off).sub(off), a);
    }

    #[test]
    fn diff_is_signed() {
        let a = Address::new(100);
        let b = Address::new(60);
        assert_eq!(a.diff(b), Offset::from_bytes(40));
        assert_eq!(b.diff(a), Offset::from_bytes(-40));
    }

    #[test]
    fn hi_and_loeq_are_unsigned_comparisons() {
        let a = Address::new(200);
        let b = Address::new(100);
        assert!(a.hi(b));
        assert!(!b.hi(a));
        assert!(b.loeq(a));
        assert!(a.loeq(a));
        assert!(!a.loeq(b));
    }

    #[test]
    fn word_index_and_alignment() {
        let a = Address::new(24);
        assert_eq!(a.word_index(), 3);
        assert!(a.is_word_aligned());
        assert!(!Address::new(25).is_word_aligned());
    }

    // === Offset scaling ===

    #[test]
    fn words_to_bytes_round_trip() {
        let off = Offset::from_words(5);
        assert_eq!(off.as_bytes(), 40);
        assert_eq!(off.to_words(), 5);
    }

    #[test]
    fn offset_addition() {
        assert_eq!(Offset::from_bytes(10) + Offset::from_bytes(-3), Offset::from_bytes(7));
    }
}
