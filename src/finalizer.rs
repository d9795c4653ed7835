//! Finalization (spec.md §3 "Finalizer record", §4.5.6).
//!
//! Grounded on the teacher's `runtime/finalizer.rs` (`Finalizer`, a queue of
//! `FinalizerEntry` drained by a runner), with the background OS thread and
//! `Arc<Mutex<_>>` queue stripped: this crate's finalizer runner is the
//! scheduler itself (spec.md §4.5.6 "handed to the scheduler's
//! finalizer-runner queue"), not a spawned thread, so a plain `VecDeque`
//! suffices.

use std::collections::VecDeque;

use crate::marker::bitmap::Bitmap;
use crate::memory::address::Address;

/// One class-bearing object registered for finalization, per spec.md §3
/// "cleared when the object becomes unreachable and the finalizer has
/// been scheduled" — this registry entry *is* that linked-list record,
/// represented as a plain `Vec` slot rather than in-heap links since
/// nothing outside this module ever walks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FinalizerEntry {
    object: Address,
}

/// The set of live objects with a pending finalizer action, plus the
/// queue of objects promoted to "run the finalizer now" during the most
/// recent mark phase.
///
/// Finalization runs at most once per object (spec.md §3, Non-goals: "No
/// support for finalizer resurrection"): once an entry is promoted it is
/// removed from `registered` and can never be promoted again.
#[derive(Debug, Default)]
pub struct FinalizerRegistry {
    registered: Vec<FinalizerEntry>,
    pending_run: VecDeque<Address>,
}

impl FinalizerRegistry {
    pub fn new() -> Self {
        FinalizerRegistry { registered: Vec::new(), pending_run: VecDeque::new() }
    }

    /// Register `object` for finalization. Called atomically with
    /// `new_instance`/`new_array` by the allocator for classes bearing
    /// `KlassFlags::HAS_FINALIZER` (spec.md §4.4).
    pub fn register(&mut self, object: Address) {
        self.registered.push(FinalizerEntry { object });
    }

    /// Count of objects still awaiting a finalizer decision this cycle.
    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Mark-phase hook (spec.md §4.5.6): after ordinary marking completes
    /// over `[collection_start, collection_end)`, any registered object
    /// whose mark bit is still clear is reachable only through its
    /// finalizer entry. Such objects are promoted: kept alive for one
    /// more cycle by setting their mark bit (so phase 2 treats them as
    /// live and compacts them normally) and moved onto the pending-run
    /// queue for the scheduler to drain. Returns how many were promoted.
    ///
    /// Must run after the ordinary mark sweep (including any overflow
    /// rescans) has reached a fixed point, so "still unmarked" truly
    /// means "unreachable except via the finalizer table".
    pub fn promote_unreachable(&mut self, bitmap: &mut Bitmap) -> usize {
        let mut promoted = 0;
        self.registered.retain(|entry| {
            if bitmap.is_set(entry.object) {
                true
            } else {
                bitmap.test_and_set_bit_for(entry.object);
                self.pending_run.push_back(entry.object);
                promoted += 1;
                false
            }
        });
        promoted
    }

    /// Like [`Self::promote_unreachable`], but only considers objects
    /// within `[start, end)`. A young collection never clears mark bits
    /// outside the young generation, so a registered old-gen object's
    /// stale bit from a previous cycle must not be misread as "still
    /// live" or "just died" this cycle — it is simply not examined.
    pub fn promote_unreachable_in(&mut self, bitmap: &mut Bitmap, start: Address, end: Address) -> usize {
        let in_range = |addr: Address| start.loeq(addr) && !end.loeq(addr);
        let mut promoted = 0;
        self.registered.retain(|entry| {
            if !in_range(entry.object) {
                return true;
            }
            if bitmap.is_set(entry.object) {
                true
            } else {
                bitmap.test_and_set_bit_for(entry.object);
                self.pending_run.push_back(entry.object);
                promoted += 1;
                false
            }
        });
        promoted
    }

    /// Pop the next object whose finalizer the scheduler should run, in
    /// discovery order (spec.md §9 open question: cross-object ordering
    /// among objects reclaimed in the same collection is otherwise
    /// unspecified).
    pub fn next_pending(&mut self) -> Option<Address> {
        self.pending_run.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_run.len()
    }
}
