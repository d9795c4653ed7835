//! Integer alignment helpers (L).
//!
//! `a` must always be a power of two; callers pass the machine word size
//! (see [`crate::memory::address::WORD_BYTES`]) or an arbitrary power-of-two
//! alignment such as a cache line.

use crate::memory::address::WORD_BYTES;

/// Round `v` up to the next multiple of `a` (`a` a power of two).
#[inline]
pub const fn round_up(v: usize, a: usize) -> usize {
    debug_assert!(a.is_power_of_two());
    (v + a - 1) & !(a - 1)
}

/// Round `v` down to the previous multiple of `a` (`a` a power of two).
#[inline]
pub const fn round_down(v: usize, a: usize) -> usize {
    debug_assert!(a.is_power_of_two());
    v & !(a - 1)
}

/// `round_up(v, WORD_BYTES)`.
#[inline]
pub const fn round_up_to_word(v: usize) -> usize {
    round_up(v, WORD_BYTES)
}

/// `round_down(v, WORD_BYTES)`.
#[inline]
pub const fn round_down_to_word(v: usize) -> usize {
    round_down(v, WORD_BYTES)
}

/// Whether `v` is already a multiple of `a`.
#[inline]
pub const fn is_aligned(v: usize, a: usize) -> bool {
    v & (a - 1) == 0
}

/// Whether `v` is word-aligned.
#[inline]
pub const fn is_word_aligned(v: usize) -> bool {
    is_aligned(v, WORD_BYTES)
}
