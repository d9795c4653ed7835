//! Raw word-sized peek/poke into the arena (L).
//!
//! This is the only place in the crate that does pointer-sized byte
//! twiddling; every other module goes through [`Address`]/[`UWord`] typed
//! values and these two functions. Reads of the class pointer and the
//! length word are the only operations spec.md §4.1 allows on an object
//! whose header word has tagged (forwarded) bits set; callers in
//! [`crate::object::header`] are the only legitimate clients.

use super::address::{Address, UWord, WORD_BYTES};

/// Read the word at `addr` (object base) plus `word_index` words.
///
/// # Panics
/// Panics if the read would run past the end of `arena`.
#[inline]
pub fn read_word(arena: &[u8], addr: Address, word_index: usize) -> UWord {
    let start = addr.as_usize() + word_index * WORD_BYTES;
    let bytes: [u8; WORD_BYTES] = arena[start..start + WORD_BYTES]
        .try_into()
        .expect("slice length is exactly WORD_BYTES");
    UWord::from_ne_bytes(bytes)
}

/// Write `value` at `addr` (object base) plus `word_index` words.
///
/// # Panics
/// Panics if the write would run past the end of `arena`.
#[inline]
pub fn write_word(arena: &mut [u8], addr: Address, word_index: usize, value: UWord) {
    let start = addr.as_usize() + word_index * WORD_BYTES;
    arena[start..start + WORD_BYTES].copy_from_slice(&value.to_ne_bytes());
}

/// Zero `len_bytes` bytes starting at `addr`. `len_bytes` need not be
/// word-aligned but in practice always is (M rounds allocation sizes up
/// to word alignment before calling this).
#[inline]
pub fn zero_range(arena: &mut [u8], addr: Address, len_bytes: usize) {
    let start = addr.as_usize();
    arena[start..start + len_bytes].fill(0);
}

/// Copy `len_bytes` bytes from `src` to `dst` within the same arena.
/// Source and destination ranges may overlap (compaction always moves
/// objects toward lower addresses).
#[inline]
pub fn copy_within(arena: &mut [u8], src: Address, dst: Address, len_bytes: usize) {
    let s = src.as_usize();
    let d = dst.as_usize();
    arena.copy_within(s..s + len_bytes, d);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut arena = vec![0u8; 64];
        write_word(&mut arena, Address::new(8), 1, 0xdead_beef_u64);
        assert_eq!(read_word(&arena, Address::new(8), 1), 0xdead_beef);
    }

    #[test]
    fn zero_range_clears_bytes() {
        let mut arena = vec![0xffu8; 32];
        zero_range(&mut arena, Address::new(8), 16);
        assert!(arena[8..24].iter().all(|&b| b == 0));
        assert!(arena[0..8].iter().all(|&b| b == 0xff));
    }

    #[test]
    fn copy_within_handles_overlap_moving_down() {
        let mut arena = vec![0u8; 32];
        for (i, b) in arena[16..24].iter_mut().enumerate() {
            *b = i as u8;
        }
        copy_within(&mut arena, Address::new(16), Address::new(8), 8);
        assert_eq!(&arena[8..16], &[0, 1, 2, 3, 4, 5, 6, 7]);
    }
}
