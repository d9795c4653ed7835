//! ObjectAssociation: the header-indirection object a RAM object gains
//! the first time it needs an identity hash or a real monitor
//! (spec.md §3 "ObjectAssociation").

use crate::memory::address::Address;

/// Index into the scheduler's monitor table. Opaque to every module but
/// [`crate::scheduler::monitor`], which owns the table this indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(pub u32);

/// An association carries the class pointer at the same conceptual slot
/// offset a raw object would, so decoding "what class is this" never
/// needs to know whether the object has been inflated.
#[derive(Debug, Clone)]
pub struct ObjectAssociation {
    class: Address,
    hash: Option<u32>,
    monitor: Option<MonitorId>,
}

impl ObjectAssociation {
    pub fn new(class: Address) -> Self {
        ObjectAssociation { class, hash: None, monitor: None }
    }

    pub fn class(&self) -> Address {
        self.class
    }

    pub fn set_class(&mut self, class: Address) {
        self.class = class;
    }

    pub fn hash(&self) -> Option<u32> {
        self.hash
    }

    /// Identity hash is assigned at most once; a second call is a no-op
    /// returning the previously assigned value.
    pub fn hash_or_assign(&mut self, assign: impl FnOnce() -> u32) -> u32 {
        *self.hash.get_or_insert_with(assign)
    }

    pub fn monitor(&self) -> Option<MonitorId> {
        self.monitor
    }

    pub fn set_monitor(&mut self, monitor: Option<MonitorId>) {
        self.monitor = monitor;
    }

    /// Whether smart-monitor retirement may reclaim this association:
    /// no identity hash was ever taken and no monitor is installed.
    pub fn is_retireable(&self) -> bool {
        self.hash.is_none() && self.monitor.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_assigned_once() {
        let mut assoc = ObjectAssociation::new(Address::new(0));
        let mut calls = 0;
        let h1 = assoc.hash_or_assign(|| {
            calls += 1;
            7
        });
        let h2 = assoc.hash_or_assign(|| {
            calls += 1;
            9
        });
        assert_eq!(h1, 7);
        assert_eq!(h2, 7);
        assert_eq!(calls, 1);
    }

    #[test]
    fn retireable_until_hash_or_monitor_taken() {
        let mut assoc = ObjectAssociation::new(Address::new(0));
        assert!(assoc.is_retireable());
        assoc.set_monitor(Some(MonitorId(1)));
        assert!(!assoc.is_retireable());
        assoc.set_monitor(None);
        assoc.hash_or_assign(|| 1);
        assert!(!assoc.is_retireable());
    }
}
