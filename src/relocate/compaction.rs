//! Phase 2 (compute new locations) and phase 4 (compact) of the Lisp-2
//! mark-compact cycle (spec.md §4.5.2, §4.5.4).
//!
//! Grounded on the teacher's `relocate/compaction.rs` (`Compactor` as a
//! stateful struct with a `start`/`complete` lifecycle) and
//! `relocate/copy.rs`'s object-move shape, but the actual algorithm here
//! is spec-driven: one contiguous heap rather than ZGC regions, and a
//! single compacting pass per cycle rather than concurrent relocation.

use crate::marker::bitmap::Bitmap;
use crate::memory::address::{Address, Offset, WORD_BYTES};
use crate::memory::raw;
use crate::object::header::{self, BlockTag, ClassWord, Region};
use crate::object::klass::ClassMetadataProvider;
use crate::object::layout::Layout;

use super::forwarding::SliceTable;

/// One live block discovered during phase 2, in address order. Exposed
/// `pub(crate)` so `gc`'s phase 3 can walk the exact same classification
/// phase 2 already paid for, rather than re-deriving it from headers that
/// phase 2 has since overwritten with forwarding words (see `gc`'s module
/// doc for why re-classifying an already-forwarded block is unsound for
/// `Layout::Instance`, whose class-word slot and tag word are the same word).
#[derive(Debug, Clone, Copy)]
pub(crate) struct LiveBlock {
    pub(crate) old_block_start: Address,
    pub(crate) layout: Layout,
    pub(crate) class_ptr: Address,
    pub(crate) body_words: usize,
}

impl LiveBlock {
    fn total_words(&self) -> usize {
        self.layout.header_words() + self.body_words
    }

    /// The object's oop (body start), the address every reference to it
    /// actually carries.
    pub(crate) fn old_oop(&self) -> Address {
        self.old_block_start.add(Offset::from_words(self.layout.header_words() as isize))
    }
}

/// Drives phase 2 and phase 4 over one collection's live set. A fresh
/// `Compactor` is built per cycle; it owns the [`SliceTable`] that phase
/// 3 (reference updating) consults afterwards.
pub struct Compactor {
    slice_table: SliceTable,
    plan: Vec<(LiveBlock, Address)>,
}

impl Compactor {
    pub fn new(collection_base: Address, heap_words: usize) -> Self {
        Compactor { slice_table: SliceTable::new(collection_base, heap_words), plan: Vec::new() }
    }

    pub fn slice_table(&self) -> &SliceTable {
        &self.slice_table
    }

    pub fn into_slice_table(self) -> SliceTable {
        self.slice_table
    }

    /// Every block phase 2 planned, in address order, with its chosen
    /// destination. `gc`'s phase 3 uses this to rewrite each live object's
    /// own reference fields before phase 4 copies the (now-updated) body.
    pub(crate) fn entries(&self) -> &[(LiveBlock, Address)] {
        &self.plan
    }

    /// Phase 2 (spec.md §4.5.2): walk the mark bitmap over
    /// `[scan_start, scan_end)` in address order. For every marked block,
    /// record its destination as the current compaction cursor (starting
    /// at `destination_base`), advance the cursor by the block's size,
    /// record the slice anchor, and overwrite the block's class-pointer
    /// slot with a forwarding word. Returns the address just past the
    /// last live object — the new allocation pointer once phase 4 runs.
    pub fn plan(
        &mut self,
        arena: &mut [u8],
        bitmap: &Bitmap,
        classes: &dyn ClassMetadataProvider,
        scan_start: Address,
        scan_end: Address,
        destination_base: Address,
    ) -> Address {
        let mut cursor = destination_base;

        for block_start in bitmap.iter_range(scan_start, scan_end) {
            let first_word = raw::read_word(arena, block_start, 0);
            let tag = header::classify_block(first_word)
                .expect("live block carries the reserved header tag");

            let (layout, class_word_index, body_words, class_ptr) = match tag {
                BlockTag::Basic => {
                    let class_ptr = match header::decode_class_word(first_word) {
                        ClassWord::Direct(addr) => addr,
                        ClassWord::Forwarded { .. } => {
                            unreachable!("phase 2 runs once, before any block can already be forwarded")
                        }
                    };
                    let klass = classes.klass(class_ptr);
                    (Layout::Instance, 0usize, klass.instance_size_words as usize, class_ptr)
                }
                BlockTag::Array => {
                    let length = header::decode_array_length(first_word);
                    let class_word = raw::read_word(arena, block_start, 1);
                    let class_ptr = match header::decode_class_word(class_word) {
                        ClassWord::Direct(addr) => addr,
                        ClassWord::Forwarded { .. } => {
                            unreachable!("phase 2 runs once, before any block can already be forwarded")
                        }
                    };
                    let klass = classes.klass(class_ptr);
                    (Layout::Array, 1usize, klass.array_body_words(length), class_ptr)
                }
                BlockTag::Method => {
                    let body_words = header::decode_method_body_words(first_word) as usize;
                    let class_word = raw::read_word(arena, block_start, 1);
                    let class_ptr = match header::decode_class_word(class_word) {
                        ClassWord::Direct(addr) => addr,
                        ClassWord::Forwarded { .. } => {
                            unreachable!("phase 2 runs once, before any block can already be forwarded")
                        }
                    };
                    (Layout::Method, 1usize, body_words, class_ptr)
                }
            };

            let block = LiveBlock { old_block_start: block_start, layout, class_ptr, body_words };
            let destination = cursor;
            cursor = cursor.add(Offset::from_words(block.total_words() as isize));

            // The slice is keyed by the object's *old* oop (the very value
            // every reference to it already holds), not its destination —
            // this is what lets phase 3 recompute the same slice index
            // from a reference it reads, without first having to decode a
            // class it can no longer reach directly (see `gc` phase 3).
            let old_oop = block_start.add(Offset::from_words(layout.header_words() as isize));
            let destination_oop = destination.add(Offset::from_words(layout.header_words() as isize));
            let slice = self.slice_table.slice_index(old_oop);
            let anchor = self.slice_table.anchor_or_insert(slice, destination_oop);
            let offset_in_slice = destination_oop.diff(anchor).to_words() as u64;

            // spec.md §4.5.2 step 6: class pointers are conceptually ROM-
            // resident metadata for this crate's represention of `Klass`
            // (see object::klass module doc), so every forwarding word
            // records `Region::Rom` with the raw class address as offset.
            let class_offset = class_ptr.as_usize() as u64;
            let forwarded = header::encode_forwarded(offset_in_slice, class_offset, Region::Rom);
            raw::write_word(arena, block_start, class_word_index, forwarded);

            self.plan.push((block, destination));
        }

        cursor
    }

    /// Phase 4 (spec.md §4.5.4): move every planned block to its recorded
    /// destination. Blocks are visited in increasing address order, so
    /// compaction always moves data downward or in place — each source
    /// range is read out via [`raw::copy_within`] (overlap-safe) only
    /// after this block's own header contents have been captured into
    /// locals, avoiding any read-after-write hazard against an
    /// already-compacted neighbor.
    pub fn compact(&self, arena: &mut [u8]) {
        for (block, destination) in &self.plan {
            let total_bytes = block.total_words() * WORD_BYTES;

            // Reconstruct the non-forwarding header words before the move
            // clobbers them; only the class-pointer slot was overwritten
            // by `plan`, so the layout-specific leading word (array length
            // / method body-words) is still intact at the old location.
            let leading_word = match block.layout {
                Layout::Instance => None,
                Layout::Array => Some(raw::read_word(arena, block.old_block_start, 0)),
                Layout::Method => Some(raw::read_word(arena, block.old_block_start, 0)),
            };

            raw::copy_within(arena, block.old_block_start, *destination, total_bytes);

            if let Some(word) = leading_word {
                raw::write_word(arena, *destination, 0, word);
            }
            let class_word_index = block.layout.class_word_index();
            raw::write_word(arena, *destination, class_word_index, header::encode_direct(block.class_ptr));
        }
    }
}
