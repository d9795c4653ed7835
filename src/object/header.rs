//! Header tag space and forwarding encoding (H).
//!
//! Three block kinds share the low two bits of a block's first word:
//! a direct instance header (`00`, also a direct class pointer), an array
//! length word (`01`), and a method header word (`10`). `11` is reserved
//! and never produced. [`classify_block`] reads this tag; it is only
//! meaningful on the first word of a block that has not yet been
//! forwarded by a collection in progress (after phase 2 runs on an
//! object its class-pointer slot is overwritten with a forwarding word —
//! for array/method blocks that slot is the *second* word, not the one
//! `classify_block` inspects, so the two uses never collide within a
//! single cycle).
//!
//! Forwarding itself lives in the class-pointer slot of a block (word 0
//! for an instance, word 1 for an array or method body). Per
//! spec.md §4.5.2's packing formula the header word is
//! `(offsetInSlice << sliceOffsetShift) | (classOffset << 2) | regionTag`.
//! For this to disambiguate cleanly against a direct, word-aligned
//! pointer (whose low two bits are always `00`), `regionTag` is drawn
//! from `{1, 2, 3}` (never `0`) — the forwarding marker and the region
//! tag occupy the same two bits rather than stacking separately. This
//! resolves the apparent conflict between spec.md §4.1's prose
//! ("two further bits select region") and §4.5.2's concrete formula.

use super::super::memory::address::{Address, UWord};

/// Number of low bits spent on tagging every header-family word.
pub const TAG_BITS: u32 = 2;
const TAG_MASK: u64 = 0b11;

/// First-word tag for a plain instance header / direct class pointer.
pub const BASIC_TAG: u64 = 0b00;
/// First-word tag for an array length word.
pub const ARRAY_TAG: u64 = 0b01;
/// First-word tag for a method header word.
pub const METHOD_TAG: u64 = 0b10;

/// Bits reserved for a class offset within its owning memory region.
pub const CLASS_OFFSET_BITS: u32 = 24;
const CLASS_OFFSET_SHIFT: u32 = TAG_BITS;
const CLASS_OFFSET_MASK: u64 = (1u64 << CLASS_OFFSET_BITS) - 1;
/// Shift to the slice-relative word offset of a forwarded object's new
/// location, the remaining high bits of the header word.
pub const SLICE_OFFSET_SHIFT: u32 = TAG_BITS + CLASS_OFFSET_BITS;

/// The first-word discriminant of a block, valid only while no
/// collection is forwarding this block's class-pointer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Basic,
    Array,
    Method,
}

/// Classify a block from its first word. Returns `None` for the
/// reserved tag `11`, which a correct implementation never produces —
/// callers in a block-start walk should treat `None` as a fatal
/// [`crate::error::FatalReason::InvalidHeaderTag`].
pub fn classify_block(first_word: UWord) -> Option<BlockTag> {
    match first_word & TAG_MASK {
        BASIC_TAG => Some(BlockTag::Basic),
        ARRAY_TAG => Some(BlockTag::Array),
        METHOD_TAG => Some(BlockTag::Method),
        _ => None,
    }
}

/// `(length << TAG_BITS) | ARRAY_TAG`, the array length header word.
#[inline]
pub fn array_length_word(length: u64) -> UWord {
    (length << TAG_BITS) | ARRAY_TAG
}

/// Recover the element count from an array length word. Caller must
/// already know (via [`classify_block`]) that this word is an array tag.
#[inline]
pub fn decode_array_length(word: UWord) -> u64 {
    word >> TAG_BITS
}

/// `(bodyWords << TAG_BITS) | METHOD_TAG`, the method header word. Unlike
/// spec.md's prose, this does not count header words (fixed at two for
/// every method body, see [`super::layout::Layout::Method`]) — it counts
/// the bytecode body length in words, exactly the way
/// [`array_length_word`] counts element count, so [`crate::gc`] can size
/// a method body the same way it sizes an array.
#[inline]
pub fn method_header_word(body_words: u64) -> UWord {
    (body_words << TAG_BITS) | METHOD_TAG
}

#[inline]
pub fn decode_method_body_words(word: UWord) -> u64 {
    word >> TAG_BITS
}

/// Which memory region a forwarded object's class descriptor lives in.
/// Values are chosen nonzero so that the forwarding marker and the
/// region tag can share the low two bits of the class word (see the
/// module doc comment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Heap = 1,
    Nvm = 2,
    Rom = 3,
}

impl Region {
    fn from_tag(tag: u64) -> Option<Region> {
        match tag {
            1 => Some(Region::Heap),
            2 => Some(Region::Nvm),
            3 => Some(Region::Rom),
            _ => None,
        }
    }

    #[inline]
    fn tag(self) -> u64 {
        self as u64
    }
}

/// The decoded contents of a block's class-pointer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassWord {
    /// Not forwarded: a direct pointer to the class descriptor (or, once
    /// an identity hash/monitor has been taken, to the object's
    /// [`super::association::ObjectAssociation`]).
    Direct(Address),
    /// Forwarded by phase 2 of a collection in progress.
    Forwarded {
        /// Word offset of the object's new location within its heap slice.
        offset_in_slice: u64,
        /// Word offset of the class descriptor within `region`.
        class_offset: u64,
        region: Region,
    },
}

/// Decode a class-pointer slot. `word mod 4 == 0` (mod TAG_MASK+1) means
/// not forwarded (invariant 7 of spec.md §8); anything else is forwarded.
///
/// # Panics
/// Panics if the nonzero tag isn't one of the three valid region tags —
/// this would mean header corruption, a core invariant violation.
pub fn decode_class_word(word: UWord) -> ClassWord {
    let tag = word & TAG_MASK;
    if tag == BASIC_TAG {
        ClassWord::Direct(Address::new(word as usize))
    } else {
        let region = Region::from_tag(tag).expect("class word tag is not a valid region");
        let class_offset = (word >> CLASS_OFFSET_SHIFT) & CLASS_OFFSET_MASK;
        let offset_in_slice = word >> SLICE_OFFSET_SHIFT;
        ClassWord::Forwarded { offset_in_slice, class_offset, region }
    }
}

/// Encode a direct (non-forwarded) class pointer. `addr` must be
/// word-aligned, which guarantees its low two bits are already `00`.
pub fn encode_direct(addr: Address) -> UWord {
    debug_assert!(addr.is_word_aligned(), "class pointer must be word-aligned");
    addr.as_usize() as u64
}

/// Pack a forwarding word per spec.md §4.5.2 phase 2 step 6.
///
/// # Panics
/// Panics if `class_offset` does not fit in [`CLASS_OFFSET_BITS`].
pub fn encode_forwarded(offset_in_slice: u64, class_offset: u64, region: Region) -> UWord {
    debug_assert!(
        class_offset <= CLASS_OFFSET_MASK,
        "class offset does not fit the reserved header bits"
    );
    (offset_in_slice << SLICE_OFFSET_SHIFT) | (class_offset << CLASS_OFFSET_SHIFT) | region.tag()
}

/// Whether a decoded class word represents a forwarded object.
#[inline]
pub fn is_forwarded(word: UWord) -> bool {
    word & TAG_MASK != BASIC_TAG
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Block tag classification ===

    #[test]
    fn basic_array_method_tags_are_disjoint() {
        assert_eq!(classify_block(BASIC_TAG), Some(BlockTag::Basic));
        assert_eq!(classify_block(ARRAY_TAG), Some(BlockTag::Array));
        assert_eq!(classify_block(METHOD_TAG), Some(BlockTag::Method));
        assert_eq!(classify_block(0b11), None);
    }

    #[test]
    fn array_length_round_trips() {
        let word = array_length_word(12345);
        assert_eq!(classify_block(word), Some(BlockTag::Array));
        assert_eq!(decode_array_length(word), 12345);
    }

    #[test]
    fn method_header_round_trips() {
        let word = method_header_word(4);
        assert_eq!(classify_block(word), Some(BlockTag::Method));
        assert_eq!(decode_method_body_words(word), 4);
    }

    // === Forwarding encoding ===

    #[test]
    fn direct_class_word_round_trips() {
        let addr = Address::new(0x1000);
        let word = encode_direct(addr);
        assert!(!is_forwarded(word));
        assert_eq!(decode_class_word(word), ClassWord::Direct(addr));
    }

    #[test]
    fn forwarded_class_word_round_trips() {
        let word = encode_forwarded(777, 42, Region::Heap);
        assert!(is_forwarded(word));
        match decode_class_word(word) {
            ClassWord::Forwarded { offset_in_slice, class_offset, region } => {
                assert_eq!(offset_in_slice, 777);
                assert_eq!(class_offset, 42);
                assert_eq!(region, Region::Heap);
            }
            ClassWord::Direct(_) => panic!("expected forwarded"),
        }
    }

    #[test]
    fn forwarded_word_differs_from_zero_mod_four() {
        let word = encode_forwarded(0, 0, Region::Rom);
        assert_ne!(word % 4, 0);
    }

    #[test]
    #[should_panic]
    fn class_offset_overflow_panics() {
        encode_forwarded(0, 1 << CLASS_OFFSET_BITS, Region::Heap);
    }
}
