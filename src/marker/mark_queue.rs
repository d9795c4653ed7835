//! Overflow-aware marking stack (spec.md §4.5.1 step 4).
//!
//! The spec models this as living in the unused heap region above
//! `heapEnd`, sized from the gap between `heapEnd` and the bitmap. This
//! crate's arena has no such gap to borrow (there is no raw byte region
//! backing the marking stack), so `MarkQueue` is a plain bounded `Vec`
//! whose capacity is still computed the same way by the caller
//! ([`crate::gc::Gc`]) from the heap layout; overflow behavior is
//! identical either way: set a flag, let the caller rescan.

use crate::memory::address::Address;

/// A bounded LIFO work-list of objects still needing transitive scan.
/// [`Self::push`] never grows past `capacity`; once full it reports
/// overflow instead and the caller is responsible for a rescan sweep
/// (spec.md §4.5.1 step 4, §9 open question 1).
#[derive(Debug)]
pub struct MarkQueue {
    stack: Vec<Address>,
    capacity: usize,
    overflowed: bool,
}

impl MarkQueue {
    pub fn new(capacity: usize) -> Self {
        MarkQueue { stack: Vec::with_capacity(capacity.min(1024)), capacity, overflowed: false }
    }

    /// Push `addr`. Returns `false` (and sets the overflow flag) if the
    /// queue is already at capacity.
    pub fn push(&mut self, addr: Address) -> bool {
        if self.stack.len() >= self.capacity {
            self.overflowed = true;
            return false;
        }
        self.stack.push(addr);
        true
    }

    pub fn pop(&mut self) -> Option<Address> {
        self.stack.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Clear the overflow flag before a rescan sweep begins.
    pub fn clear_overflow(&mut self) -> bool {
        std::mem::replace(&mut self.overflowed, false)
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_lifo() {
        let mut q = MarkQueue::new(4);
        q.push(Address::new(8));
        q.push(Address::new(16));
        assert_eq!(q.pop(), Some(Address::new(16)));
        assert_eq!(q.pop(), Some(Address::new(8)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn push_past_capacity_sets_overflow_and_refuses() {
        let mut q = MarkQueue::new(2);
        assert!(q.push(Address::new(0)));
        assert!(q.push(Address::new(8)));
        assert!(!q.push(Address::new(16)));
        assert!(q.has_overflowed());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn clear_overflow_resets_flag_and_returns_previous_value() {
        let mut q = MarkQueue::new(1);
        q.push(Address::new(0));
        q.push(Address::new(8));
        assert!(q.clear_overflow());
        assert!(!q.has_overflowed());
    }
}
