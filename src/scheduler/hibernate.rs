//! Isolate hibernation (spec.md §4.6 "Hibernation", §8 scenario S6).
//!
//! No teacher analogue. Grounded directly in spec.md's description:
//! hibernation moves an entire isolate's alive threads into per-isolate
//! hibernated-run and hibernated-timer sublists, pre-empting the current
//! thread if it belongs to that isolate; unhibernation reverses the
//! move. This module only holds the moved-aside state; the actual
//! queue/registry surgery lives in [`super::Scheduler::hibernate_isolate`]
//! /[`super::Scheduler::unhibernate_isolate`], which alone have the
//! borrows (ready queue, timer queue, chunk registry) needed to perform
//! the move.

use crate::chunks::stack_chunk::StackChunk;

use super::thread::{IsolateId, ThreadId};
use super::timer_queue::TimerEntry;

/// One thread pulled out of the ready queue at hibernation time.
#[derive(Debug, Clone, Copy)]
pub struct HibernatedReadyThread {
    pub thread: ThreadId,
    pub priority: u8,
}

/// Everything [`super::Scheduler::hibernate_isolate`] pulled out of the
/// live scheduler state for one isolate, kept together so
/// `unhibernate_isolate` can restore it verbatim (spec.md §8 S6: "the
/// hibernated-thread lists total 3 entries; unhibernate; assert W again
/// contains those 3 chunks linked to live threads").
#[derive(Debug, Default)]
pub struct HibernatedIsolate {
    pub ready: Vec<HibernatedReadyThread>,
    /// Timer entries with their wake time already converted to a
    /// remaining-delta relative to the hibernation instant, so
    /// unhibernation can re-anchor them to the new "now" (spec.md §8
    /// round-trip law: "same pending wake time delta measured from the
    /// unhibernation instant").
    pub timers: Vec<(TimerEntry, u64)>,
    /// Stack chunks pruned from W for this isolate's threads, to be
    /// re-appended on unhibernation (spec.md §4.3 `append`).
    pub chunks: Vec<StackChunk>,
}

impl HibernatedIsolate {
    pub fn new() -> Self {
        HibernatedIsolate::default()
    }

    pub fn thread_count(&self) -> usize {
        self.ready.len() + self.timers.len()
    }
}

/// Registry of currently-hibernated isolates, owned by
/// [`super::Scheduler`].
#[derive(Debug, Default)]
pub struct HibernationRegistry {
    hibernated: Vec<(IsolateId, HibernatedIsolate)>,
}

impl HibernationRegistry {
    pub fn new() -> Self {
        HibernationRegistry { hibernated: Vec::new() }
    }

    pub fn insert(&mut self, isolate: IsolateId, state: HibernatedIsolate) {
        self.hibernated.push((isolate, state));
    }

    pub fn take(&mut self, isolate: IsolateId) -> Option<HibernatedIsolate> {
        let pos = self.hibernated.iter().position(|(id, _)| *id == isolate)?;
        Some(self.hibernated.remove(pos).1)
    }

    pub fn is_hibernated(&self, isolate: IsolateId) -> bool {
        self.hibernated.iter().any(|(id, _)| *id == isolate)
    }

    pub fn count(&self) -> usize {
        self.hibernated.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_take_round_trips() {
        let mut reg = HibernationRegistry::new();
        let mut state = HibernatedIsolate::new();
        state.ready.push(HibernatedReadyThread { thread: ThreadId(1), priority: 5 });
        reg.insert(IsolateId(0), state);

        assert!(reg.is_hibernated(IsolateId(0)));
        let taken = reg.take(IsolateId(0)).unwrap();
        assert_eq!(taken.thread_count(), 1);
        assert!(!reg.is_hibernated(IsolateId(0)));
    }

    #[test]
    fn take_on_unknown_isolate_is_none() {
        let mut reg = HibernationRegistry::new();
        assert!(reg.take(IsolateId(9)).is_none());
    }
}
