//! Object layout families (spec.md §3): instance, array, method.

use crate::memory::address::WORD_BITS;
use super::header::TAG_BITS;

/// Which of the three layout families a block belongs to.
///
/// `Method` is kept the same two-word shape as `Array` rather than the
/// variable-width header spec.md's prose sketches ("headerWords, class
/// pointer, bytecode-array identity, bytecode bytes"). A variable header
/// width makes the class word's offset from the body depend on the very
/// class it is used to find — circular for any collector operation that
/// starts from an oop rather than a block start. Fixing the header at
/// two words (tag word, class word) for both families means the class
/// word is always exactly one word before the body, for every layout,
/// and the tag word carries the body's word length directly (reusing
/// `header::method_header_word`/`array_length_word` so `Gc` sizes a
/// method body exactly like an array body). The bytecode-array-identity
/// slot spec.md's prose describes becomes body word 0 by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Single-word header holding a direct class (or association) pointer.
    Instance,
    /// Two-word header: tagged length word, then class pointer.
    Array,
    /// Two-word header: tagged bytecode-length word, then class pointer.
    Method,
}

impl Layout {
    /// Header size in words, not counting the body.
    pub fn header_words(self) -> usize {
        match self {
            Layout::Instance => 1,
            Layout::Array | Layout::Method => 2,
        }
    }

    /// Word index, relative to the block start, of the class-pointer
    /// slot that [`super::header::decode_class_word`]/`encode_forwarded`
    /// operate on. Equal to `header_words() - 1` for every family, i.e.
    /// the class word always sits exactly one word before the body.
    pub fn class_word_index(self) -> usize {
        match self {
            Layout::Instance => 0,
            Layout::Array | Layout::Method => 1,
        }
    }
}

/// Largest array length that fits in a length word for a `word_bits`-wide
/// machine word, given [`TAG_BITS`] spent on the array tag.
///
/// Exposed (rather than hardcoded) so tests can exercise the boundary at
/// a small, deliberately chosen width instead of 2^62.
pub fn max_encodable_length(word_bits: u32) -> u64 {
    (1u64 << (word_bits - TAG_BITS)) - 1
}

/// [`max_encodable_length`] for this crate's fixed word width.
pub fn default_max_array_length() -> u64 {
    max_encodable_length(WORD_BITS)
}
