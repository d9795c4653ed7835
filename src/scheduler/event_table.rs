//! The one-to-one event table (spec.md §4.6 "Event table").
//!
//! Grounded on spec.md's description plus the teacher's `indexmap` use
//! for its own ordered diagnostics maps (see `allocator::romfs::RomRegistry`
//! for the same choice in this crate): deterministic iteration matters
//! for reproducible tests even though the table's access pattern is
//! otherwise a plain map.

use indexmap::IndexMap;

use super::thread::ThreadId;

/// Opaque channel-I/O event identifier (spec.md §6 "Channel I/O ↔ Core").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub u32);

/// A 1:1 mapping from event id to the single thread blocked on it
/// (spec.md §4.6 "a mapping from integer event id to the single thread
/// blocked on it").
#[derive(Debug, Default)]
pub struct EventTable {
    blocked: IndexMap<EventId, ThreadId>,
}

impl EventTable {
    pub fn new() -> Self {
        EventTable { blocked: IndexMap::new() }
    }

    /// Block `thread` on `event`.
    ///
    /// # Panics
    /// Debug-asserts `event` is not already claimed — the one-to-one
    /// contract means two threads can never wait on the same event.
    pub fn block_on(&mut self, event: EventId, thread: ThreadId) {
        debug_assert!(!self.blocked.contains_key(&event), "event already has a waiting thread");
        self.blocked.insert(event, thread);
    }

    /// An external event arrived: remove and return the thread waiting
    /// on it, if any (spec.md §4.6 step 1 "for each, signal the
    /// corresponding thread").
    pub fn signal(&mut self, event: EventId) -> Option<ThreadId> {
        self.blocked.shift_remove(&event)
    }

    /// Cancel a wait before its event ever arrives (e.g. isolate abort).
    pub fn cancel(&mut self, thread: ThreadId) -> Option<EventId> {
        let event = self.blocked.iter().find(|(_, t)| **t == thread).map(|(e, _)| *e)?;
        self.blocked.shift_remove(&event);
        Some(event)
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_removes_and_returns_the_waiting_thread() {
        let mut table = EventTable::new();
        table.block_on(EventId(1), ThreadId(7));
        assert_eq!(table.signal(EventId(1)), Some(ThreadId(7)));
        assert!(table.is_empty());
        assert_eq!(table.signal(EventId(1)), None);
    }

    #[test]
    fn cancel_finds_by_thread_not_event() {
        let mut table = EventTable::new();
        table.block_on(EventId(5), ThreadId(2));
        assert_eq!(table.cancel(ThreadId(2)), Some(EventId(5)));
        assert!(table.is_empty());
    }

    #[test]
    #[should_panic]
    fn blocking_two_threads_on_the_same_event_panics_in_debug() {
        let mut table = EventTable::new();
        table.block_on(EventId(1), ThreadId(1));
        table.block_on(EventId(1), ThreadId(2));
    }
}
