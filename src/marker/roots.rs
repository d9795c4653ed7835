//! Global GC root table (spec.md §4.5.1 step 2 "global-oop table").
//!
//! Grounded on the teacher's `marker/roots.rs` (`RootDescriptor`,
//! `RootHandle`) with the atomics stripped — single-threaded, so a root
//! slot is just an `Option<Address>` behind a stable handle.

use crate::memory::address::Address;

/// A stable handle into the root table, returned by [`RootTable::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootHandle(usize);

/// The global root table: every slot the interpreter (or this crate's own
/// class-state / read-only-memory registries) has registered as a GC
/// root. Marking treats every non-empty slot as live.
#[derive(Debug, Default)]
pub struct RootTable {
    slots: Vec<Option<Address>>,
}

impl RootTable {
    pub fn new() -> Self {
        RootTable { slots: Vec::new() }
    }

    pub fn register(&mut self, addr: Address) -> RootHandle {
        self.slots.push(Some(addr));
        RootHandle(self.slots.len() - 1)
    }

    pub fn unregister(&mut self, handle: RootHandle) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            *slot = None;
        }
    }

    pub fn get(&self, handle: RootHandle) -> Option<Address> {
        self.slots.get(handle.0).copied().flatten()
    }

    /// Update a root in place, e.g. after phase 3 rewrites a forwarded
    /// reference.
    pub fn set(&mut self, handle: RootHandle, addr: Address) {
        if let Some(slot) = self.slots.get_mut(handle.0) {
            *slot = Some(addr);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }

    pub fn iter_handles(&self) -> impl Iterator<Item = (RootHandle, Address)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.map(|a| (RootHandle(i), a)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_get_round_trips() {
        let mut roots = RootTable::new();
        let h = roots.register(Address::new(0x40));
        assert_eq!(roots.get(h), Some(Address::new(0x40)));
    }

    #[test]
    fn unregister_clears_the_slot() {
        let mut roots = RootTable::new();
        let h = roots.register(Address::new(0x40));
        roots.unregister(h);
        assert_eq!(roots.get(h), None);
        assert_eq!(roots.count(), 0);
    }

    #[test]
    fn set_rewrites_a_root_after_forwarding() {
        let mut roots = RootTable::new();
        let h = roots.register(Address::new(0x40));
        roots.set(h, Address::new(0x80));
        assert_eq!(roots.get(h), Some(Address::new(0x80)));
    }

    #[test]
    fn iter_skips_unregistered_slots() {
        let mut roots = RootTable::new();
        let a = roots.register(Address::new(1));
        roots.register(Address::new(2));
        roots.unregister(a);
        let all: Vec<_> = roots.iter().collect();
        assert_eq!(all, vec![Address::new(2)]);
    }
}
