//! Bump-pointer allocation (spec.md §4.4), shared by the young-generation
//! allocator in [`super::manager`] and the NVM allocator in [`super::nvm`].
//!
//! Grounded on the teacher's `allocator/bump.rs` `BumpPointerAllocator`
//! with the CAS loop removed: this VM is cooperatively single-threaded
//! (spec.md §5), so a bump allocation is a plain bounds check plus an
//! unconditional pointer advance.

use crate::memory::address::Address;

/// A single contiguous bump region `[start, end)`.
#[derive(Debug, Clone, Copy)]
pub struct BumpAllocator {
    start: Address,
    top: Address,
    end: Address,
}

impl BumpAllocator {
    pub fn new(start: Address, end: Address) -> Self {
        debug_assert!(start.loeq(end), "bump region end precedes start");
        BumpAllocator { start, top: start, end }
    }

    /// Reserve `size` bytes, advancing `top` by exactly `size`. `size`
    /// must already be word-aligned by the caller (spec.md §4.4).
    pub fn bump(&mut self, size: usize) -> Option<Address> {
        let candidate = self.top;
        let new_top = candidate.add(crate::memory::address::Offset::from_bytes(size as isize));
        if new_top.hi(self.end) {
            return None;
        }
        self.top = new_top;
        Some(candidate)
    }

    pub fn remaining(&self) -> usize {
        self.end.diff(self.top).as_bytes() as usize
    }

    pub fn allocated(&self) -> usize {
        self.top.diff(self.start).as_bytes() as usize
    }

    pub fn capacity(&self) -> usize {
        self.end.diff(self.start).as_bytes() as usize
    }

    pub fn top(&self) -> Address {
        self.top
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    /// Reset the bump pointer back to the region start, e.g. after a
    /// collection reclaims the whole region.
    pub fn reset(&mut self) {
        self.top = self.start;
    }

    /// Move the bump pointer directly, e.g. after compaction computes
    /// the new allocation pointer. `addr` must lie within `[start, end]`.
    pub fn set_top(&mut self, addr: Address) {
        debug_assert!(self.start.loeq(addr) && addr.loeq(self.end), "set_top out of bump region");
        self.top = addr;
    }

    /// Shrink or grow the region end, e.g. when the collector resizes the
    /// young generation after a cycle.
    pub fn set_end(&mut self, end: Address) {
        self.end = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_advances_by_exactly_size() {
        let mut a = BumpAllocator::new(Address::new(0), Address::new(64));
        let p1 = a.bump(16).unwrap();
        assert_eq!(p1, Address::new(0));
        assert_eq!(a.top(), Address::new(16));
        let p2 = a.bump(16).unwrap();
        assert_eq!(p2, Address::new(16));
    }

    #[test]
    fn bump_fails_past_end() {
        let mut a = BumpAllocator::new(Address::new(0), Address::new(16));
        assert!(a.bump(8).is_some());
        assert!(a.bump(16).is_none());
        // a failed bump must not move top
        assert_eq!(a.top(), Address::new(8));
    }

    #[test]
    fn bump_requiring_exactly_remaining_space_succeeds() {
        let mut a = BumpAllocator::new(Address::new(0), Address::new(16));
        assert!(a.bump(16).is_some());
        assert_eq!(a.remaining(), 0);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut a = BumpAllocator::new(Address::new(8), Address::new(32));
        a.bump(8);
        a.reset();
        assert_eq!(a.top(), Address::new(8));
        assert_eq!(a.allocated(), 0);
    }
}
