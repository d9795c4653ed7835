//! The priority-ordered ready queue (spec.md §4.6 "Ready queue").
//!
//! Grounded directly in spec.md's prose ("Insertion finds the insertion
//! point by walking while priority is greater than or equal to the
//! inserted thread's priority, so equal priorities produce FIFO within
//! the level") — a plain sorted `Vec` rather than an intrusive linked
//! list, in the same "collection wrapper over a standard container"
//! idiom the teacher uses for [`crate::marker::mark_queue::MarkQueue`].

use super::thread::ThreadId;

/// Priority-ordered FIFO-within-level run queue (spec.md §8 invariant 5:
/// for all threads `t` before `u` in the queue, `t.priority >= u.priority`).
#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: Vec<(u8, ThreadId)>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        ReadyQueue { entries: Vec::new() }
    }

    /// Insert `thread` at priority `priority`. Walks past every entry
    /// whose priority is `>=` the new one (spec.md §4.6), landing just
    /// before the first strictly-lower-priority entry — equal-priority
    /// threads therefore queue up FIFO.
    pub fn enqueue(&mut self, priority: u8, thread: ThreadId) {
        let pos = self.entries.iter().position(|(p, _)| *p < priority).unwrap_or(self.entries.len());
        self.entries.insert(pos, (priority, thread));
    }

    /// Pop the head of the queue (the highest-priority, longest-waiting
    /// thread).
    pub fn dequeue(&mut self) -> Option<ThreadId> {
        if self.entries.is_empty() { None } else { Some(self.entries.remove(0).1) }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove every instance of `thread`, e.g. when hibernation pulls an
    /// isolate's threads out of the live ready queue. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, thread: ThreadId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, t)| *t != thread);
        self.entries.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, ThreadId)> + '_ {
        self.entries.iter().copied()
    }
}
