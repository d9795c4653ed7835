//! NVM (non-volatile memory) allocator (spec.md §4.4 "Arbitrate access to
//! NVM via a bump allocator with explicit OOM when exhausted").
//!
//! NVM objects are never compacted (spec.md §1 non-goals) and never
//! scanned for roots beyond what the interpreter registers explicitly, so
//! this is a bare [`BumpAllocator`] with no collector hook at all.

use super::bump::BumpAllocator;
use crate::error::VmError;
use crate::memory::address::Address;

pub struct NvmAllocator {
    bump: BumpAllocator,
    arena: Vec<u8>,
}

impl NvmAllocator {
    pub fn new(size_bytes: usize) -> Self {
        NvmAllocator { bump: BumpAllocator::new(Address::ZERO, Address::new(size_bytes)), arena: vec![0; size_bytes] }
    }

    pub fn allocate(&mut self, size_bytes: usize) -> Result<Address, VmError> {
        let size = crate::util::alignment::round_up_to_word(size_bytes);
        self.bump.bump(size).ok_or(VmError::OutOfMemory)
    }

    pub fn arena(&self) -> &[u8] {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut [u8] {
        &mut self.arena
    }

    pub fn remaining(&self) -> usize {
        self.bump.remaining()
    }
}
