//! Memory Manager (M): the allocator carved out of the single contiguous
//! RAM region (spec.md §4.4).
//!
//! Grounded on the teacher's retry-with-collect shape in `gc.rs`
//! (`GarbageCollector::allocate`) and the bookkeeping in `heap/region.rs`,
//! but split along spec.md's own seam: `MemoryManager` owns the arena
//! bytes, the young/old boundary, and the raw allocation primitive; the
//! "fail, drive a collection, retry once" loop (spec.md §4.4) is owned by
//! [`crate::Vm::allocate`], which is the only thing in this crate that
//! holds both M and G at once (see "Global mutable state" in spec.md §9
//! — implementers should pass a `Vm` object as context rather than
//! relying on implicit globals).
//!
//! Stack chunks are modeled as first-class Rust values
//! ([`crate::chunks::StackChunk`]) owned by the chunk registry rather
//! than as raw array-layout bytes inside this arena — representing
//! activation frames as a tagged byte array would need `unsafe`
//! transmutation for no benefit in a safe-Rust simulation of the VM.
//! [`MemoryManager::new_stack`] still enforces the spec's contract (a
//! word-budget check, never triggers a collection, `None` on failure) by
//! bumping a separate stack-word budget rather than carving bytes from
//! the main arena.

use crate::marker::bitmap::Bitmap;
use crate::memory::address::{Address, Offset, WORD_BYTES};
use crate::memory::raw;
use crate::object::header;
use crate::object::layout::{max_encodable_length, Layout};

use super::bump::BumpAllocator;
use super::nvm::NvmAllocator;
use super::romfs::RomRegistry;

/// RAII guard returned by [`MemoryManager::disable_allocation`]. While
/// held, [`MemoryManager::allocation_enabled`] is `false` — the
/// scheduler's safe-to-switch-threads predicate consults exactly that
/// flag (spec.md §4.4, §4.6).
pub struct AllocationDisabledGuard<'a> {
    manager: &'a mut MemoryManager,
}

impl<'a> Drop for AllocationDisabledGuard<'a> {
    fn drop(&mut self) {
        self.manager.allocation_enabled = true;
    }
}

/// M: the memory manager.
pub struct MemoryManager {
    arena: Vec<u8>,
    heap_start: Address,
    heap_end: Address,
    /// `[young_generation_start, ap)` is live young-gen data; `[ap, yge)`
    /// is young-gen free space. `[heap_start, young_generation_start)` is
    /// the old generation, populated implicitly by compaction promoting
    /// survivors (spec.md §4.5.4).
    young: BumpAllocator,
    allocation_enabled: bool,
    excessive_gc: bool,
    stack_words_budget: usize,
    stack_words_used: usize,
    nvm: NvmAllocator,
    rom: RomRegistry,
    /// Remembered-set bits for old-to-young references (spec.md §4.5.7).
    /// Same physical bitmap type as G's mark bitmap ([`crate::marker::bitmap::Bitmap`]),
    /// a distinct instance here because the two are live simultaneously
    /// during a young collection (mark bits over the young range, barrier
    /// bits over the old range being scanned as an extra root source).
    write_barrier: Bitmap,
}

impl MemoryManager {
    pub fn new(heap_bytes: usize, nvm_bytes: usize, stack_words_budget: usize) -> Self {
        let heap_start = Address::ZERO;
        let heap_end = Address::new(heap_bytes);
        MemoryManager {
            arena: vec![0; heap_bytes],
            heap_start,
            heap_end,
            young: BumpAllocator::new(heap_start, heap_end),
            allocation_enabled: true,
            excessive_gc: false,
            stack_words_budget,
            stack_words_used: 0,
            nvm: NvmAllocator::new(nvm_bytes),
            rom: RomRegistry::new(),
            write_barrier: Bitmap::new(heap_start, heap_bytes / WORD_BYTES),
        }
    }

    /// Interpreter-facing write barrier (spec.md §6 "`write_barrier(object,
    /// slotWordIndex)`"): set the bit for the word being written.
    /// Idempotent. The interpreter calls this for every reference store
    /// into a RAM object's reference slot, regardless of whether the
    /// object being written into is in the old generation — G only
    /// consults the bits that fall within the old generation (spec.md
    /// §4.5.7), so over-setting bits for young-gen stores is harmless.
    pub fn write_barrier(&mut self, slot_addr: Address) {
        self.write_barrier.set_bit_for(slot_addr);
    }

    pub fn write_barrier_bits(&self) -> &Bitmap {
        &self.write_barrier
    }

    pub fn write_barrier_bits_mut(&mut self) -> &mut Bitmap {
        &mut self.write_barrier
    }

    pub fn arena(&self) -> &[u8] {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut [u8] {
        &mut self.arena
    }

    pub fn heap_start(&self) -> Address {
        self.heap_start
    }

    pub fn heap_end(&self) -> Address {
        self.heap_end
    }

    pub fn young_generation_start(&self) -> Address {
        self.young.start()
    }

    pub fn allocation_pointer(&self) -> Address {
        self.young.top()
    }

    pub fn young_generation_end(&self) -> Address {
        self.young.end()
    }

    pub fn nvm(&self) -> &NvmAllocator {
        &self.nvm
    }

    pub fn nvm_mut(&mut self) -> &mut NvmAllocator {
        &mut self.nvm
    }

    pub fn rom(&self) -> &RomRegistry {
        &self.rom
    }

    pub fn rom_mut(&mut self) -> &mut RomRegistry {
        &mut self.rom
    }

    /// Free bytes remaining in the young generation below `yge`.
    pub fn young_free_bytes(&self) -> usize {
        self.young.remaining()
    }

    pub fn excessive_gc(&self) -> bool {
        self.excessive_gc
    }

    pub fn set_excessive_gc(&mut self, on: bool) {
        self.excessive_gc = on;
    }

    pub fn allocation_enabled(&self) -> bool {
        self.allocation_enabled
    }

    /// The scheduler must consult this before performing a thread switch
    /// (spec.md §4.4 "Safe-to-switch-threads predicate").
    pub fn safe_to_switch_threads(&self) -> bool {
        self.allocation_enabled
    }

    /// Disable allocation for the duration of the guard. Used around G's
    /// critical sections; recursive collection (disabling while already
    /// disabled) is a caller bug, asserted in debug builds.
    pub fn disable_allocation(&mut self) -> AllocationDisabledGuard<'_> {
        debug_assert!(self.allocation_enabled, "recursive allocation-disable: collection re-entered");
        self.allocation_enabled = false;
        AllocationDisabledGuard { manager: self }
    }

    /// Run `f` with allocation disabled, re-enabling it on the way out
    /// regardless of how `f` returns. Equivalent to [`Self::disable_allocation`]
    /// but usable when `f` itself needs `&mut MemoryManager` (e.g. `Gc::collect`),
    /// which an outstanding [`AllocationDisabledGuard`] would otherwise
    /// keep borrowed.
    pub fn with_allocation_disabled<R>(&mut self, f: impl FnOnce(&mut MemoryManager) -> R) -> R {
        debug_assert!(self.allocation_enabled, "recursive allocation-disable: collection re-entered");
        self.allocation_enabled = false;
        let result = f(self);
        self.allocation_enabled = true;
        result
    }

    /// Raw allocation primitive (spec.md §4.4 "Allocation contract").
    /// Never drives a collection; returns `None` on failure, exactly as
    /// `new_stack` also requires.
    ///
    /// `body_words` is the size of the object's body, not counting the
    /// layout's own header words. For an array, `array_length` is the
    /// value encoded into the length word (already validated by the
    /// caller against [`max_encodable_length`]) and need not equal
    /// `body_words` (an array of double-word elements has `body_words ==
    /// 2 * array_length`, for instance).
    pub fn try_allocate(
        &mut self,
        class_ptr: Address,
        layout: Layout,
        body_words: usize,
        array_length: Option<u64>,
    ) -> Option<Address> {
        let header_words = layout.header_words();
        let size_bytes = (header_words + body_words) * WORD_BYTES;

        let block_start = self.young.bump(size_bytes)?;
        let oop = block_start.add(Offset::from_words(header_words as isize));

        match layout {
            Layout::Instance => {
                raw::write_word(&mut self.arena, block_start, 0, header::encode_direct(class_ptr));
            }
            Layout::Array => {
                let length = array_length.unwrap_or(0);
                raw::write_word(&mut self.arena, block_start, 0, header::array_length_word(length));
                raw::write_word(&mut self.arena, block_start, 1, header::encode_direct(class_ptr));
            }
            Layout::Method => {
                raw::write_word(&mut self.arena, block_start, 0, header::method_header_word(body_words as u64));
                raw::write_word(&mut self.arena, block_start, 1, header::encode_direct(class_ptr));
            }
        }

        raw::zero_range(&mut self.arena, oop, body_words * WORD_BYTES);

        Some(oop)
    }

    /// `new_instance`: allocate a fixed-size instance body.
    pub fn new_instance(&mut self, class_ptr: Address, instance_words: usize) -> Option<Address> {
        self.try_allocate(class_ptr, Layout::Instance, instance_words, None)
    }

    /// `new_array`: allocate an array body of `length` elements of
    /// `element_words` words each. Oversize lengths are out-of-memory by
    /// contract, not a panic (spec.md §4.1 "Array length encoding"),
    /// signalled here by returning `None` exactly like any other
    /// allocation failure, leaving the OOM-vs-retry decision to the
    /// caller.
    pub fn new_array(&mut self, class_ptr: Address, element_words: usize, length: u64) -> Option<Address> {
        if length > max_encodable_length(crate::memory::address::WORD_BITS) {
            return None;
        }
        let body_words = element_words * length as usize;
        self.try_allocate(class_ptr, Layout::Array, body_words, Some(length))
    }

    /// `new_method`: allocate a method body of `bytecode_len_words` words.
    /// Body word 0 is the bytecode-array-identity slot by convention
    /// (see [`Layout::Method`]); the remaining words are opaque bytecode
    /// bytes as far as this crate's scanner is concerned.
    pub fn new_method(&mut self, class_ptr: Address, bytecode_len_words: usize) -> Option<Address> {
        self.try_allocate(class_ptr, Layout::Method, bytecode_len_words, Some(bytecode_len_words as u64))
    }

    /// `new_stack(words)`: reserve `words` against the stack budget.
    /// Must not invoke G (spec.md §4.4); on failure the caller retries
    /// after an explicit collection that frees budget via
    /// [`Self::release_stack_words`].
    pub fn new_stack(&mut self, words: usize) -> bool {
        if self.stack_words_used + words > self.stack_words_budget {
            return false;
        }
        self.stack_words_used += words;
        true
    }

    /// Return `words` to the stack budget, e.g. when G prunes an orphan
    /// chunk.
    pub fn release_stack_words(&mut self, words: usize) {
        self.stack_words_used = self.stack_words_used.saturating_sub(words);
    }

    /// Update the young/old boundary and young-generation ceiling after a
    /// collection completes (spec.md §4.5.4). `new_ap` is the address
    /// just past the last live object; `yge` is capped at `heap_end`.
    pub fn reset_generations(&mut self, new_young_start: Address, ideal_young_generation_bytes: usize) {
        let yge = {
            let candidate = new_young_start.add(Offset::from_bytes(ideal_young_generation_bytes as isize));
            if candidate.hi(self.heap_end) { self.heap_end } else { candidate }
        };
        self.young = BumpAllocator::new(new_young_start, yge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_instance_zeroes_body_and_writes_class_pointer() {
        let mut m = MemoryManager::new(4096, 256, 64);
        let klass = Address::new(0x800);
        let oop = m.new_instance(klass, 2).unwrap();
        assert!(oop.is_word_aligned());
        // class word lives one word before the body for Instance layout
        let header_addr = oop.sub(Offset::from_words(1));
        assert_eq!(raw::read_word(m.arena(), header_addr, 0), header::encode_direct(klass));
    }

    #[test]
    fn new_array_zero_length_succeeds() {
        let mut m = MemoryManager::new(4096, 256, 64);
        let oop = m.new_array(Address::new(0x800), 1, 0);
        assert!(oop.is_some());
    }

    #[test]
    fn new_array_oversize_length_fails() {
        let mut m = MemoryManager::new(4096, 256, 64);
        let too_big = max_encodable_length(crate::memory::address::WORD_BITS) + 1;
        assert!(m.new_array(Address::new(0x800), 1, too_big).is_none());
    }

    #[test]
    fn allocation_exactly_filling_young_generation_succeeds() {
        let mut m = MemoryManager::new(64, 16, 8);
        // Instance header (1 word) + 7 body words == 64 bytes exactly.
        assert!(m.new_instance(Address::new(0), 7).is_some());
        assert_eq!(m.young_free_bytes(), 0);
    }

    #[test]
    fn allocation_past_young_generation_fails() {
        let mut m = MemoryManager::new(16, 16, 8);
        assert!(m.new_instance(Address::new(0), 100).is_none());
    }

    #[test]
    fn disable_allocation_guard_restores_on_drop() {
        let mut m = MemoryManager::new(64, 16, 8);
        {
            let guard = m.disable_allocation();
            assert!(!guard.manager.allocation_enabled());
        }
        assert!(m.allocation_enabled());
    }

    #[test]
    fn new_stack_respects_budget_without_touching_heap() {
        let mut m = MemoryManager::new(64, 16, 10);
        assert!(m.new_stack(6));
        assert!(!m.new_stack(6));
        m.release_stack_words(6);
        assert!(m.new_stack(6));
    }

    #[test]
    fn reset_generations_caps_yge_at_heap_end() {
        let mut m = MemoryManager::new(64, 16, 8);
        m.new_instance(Address::new(0), 7);
        m.reset_generations(Address::new(0), 1000);
        assert_eq!(m.young_generation_end(), m.heap_end());
    }

    #[test]
    fn write_barrier_is_idempotent() {
        let mut m = MemoryManager::new(64, 16, 8);
        let slot = Address::new(8);
        m.write_barrier(slot);
        m.write_barrier(slot);
        assert!(m.write_barrier_bits().is_set(slot));
    }
}
