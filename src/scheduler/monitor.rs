//! Monitors: lazy inflation, enter/exit/wait/notify, pending virtual
//! monitors, and smart-monitor retirement (spec.md §3 "Monitor",
//! §4.6 "Monitors", §9 "Smart monitors").
//!
//! No teacher analogue; the struct/method shape (a small owned state
//! machine plus an RAII-flavored acquire/release pair) is borrowed from
//! the teacher's `runtime/safepoint.rs` (`SafepointManager`/
//! `SafepointGuard`) and retargeted at monitor semantics. Spec.md models
//! a monitor as living behind an object's header-redirected association
//! slot (RAM) or a per-isolate hashtable (ROM/NVM); this crate collapses
//! both onto a single `Address`-keyed [`AssociationTable`] side table
//! rather than threading an `unsafe` header rewrite through every
//! monitor operation, since nothing downstream needs the bit-level
//! redirection — only "does this object have an association yet, and
//! what does it hold" (documented in DESIGN.md as a deliberate
//! simplification of spec.md §3's association-indirection encoding).

use std::collections::{HashMap, VecDeque};

use crate::error::VmError;
use crate::memory::address::Address;
use crate::object::association::{MonitorId, ObjectAssociation};

use super::thread::ThreadId;

/// A lazily-allocated monitor descriptor (spec.md §3 "Monitor").
#[derive(Debug, Default)]
pub struct Monitor {
    pub owner: Option<ThreadId>,
    pub depth: u32,
    /// Threads contending for ownership, each paired with the depth they
    /// should resume at once granted: `1` for a plain `monitor_enter`
    /// contender, or the depth saved by `monitor_wait` for a resumed one.
    pub wait_to_acquire: VecDeque<(ThreadId, u32)>,
    /// Threads parked on the condition queue, paired with the depth
    /// `monitor_wait` saved for them.
    pub condvar_queue: VecDeque<(ThreadId, u32)>,
    /// Set the first time any thread ever calls `monitor_wait` on this
    /// monitor; smart-monitor retirement (spec.md §9) may reclaim the
    /// monitor on exit only while this stays `false`.
    pub had_a_waiter: bool,
}

/// Outcome of [`MonitorTable::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// Acquired uncontended or re-entrantly; new nesting depth returned.
    Acquired(u32),
    /// Contended: `thread` was pushed onto the wait-to-acquire queue and
    /// the caller must reschedule.
    Blocked,
}

/// Outcome of [`MonitorTable::exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Depth decremented but still held by the same owner.
    StillHeld(u32),
    /// Depth reached zero. `next_owner` is who the monitor was handed to
    /// (already recorded as the new owner, depth 1), if anyone was
    /// waiting; `retireable` is whether smart-monitor mode may now
    /// reclaim this monitor's slot.
    Released { next_owner: Option<ThreadId>, retireable: bool },
}

/// The table of inflated monitors, indexed by [`MonitorId`].
#[derive(Debug, Default)]
pub struct MonitorTable {
    monitors: Vec<Option<Monitor>>,
}

impl MonitorTable {
    pub fn new() -> Self {
        MonitorTable { monitors: Vec::new() }
    }

    pub fn alloc(&mut self) -> MonitorId {
        self.monitors.push(Some(Monitor::default()));
        MonitorId((self.monitors.len() - 1) as u32)
    }

    pub fn get(&self, id: MonitorId) -> &Monitor {
        self.monitors[id.0 as usize].as_ref().expect("monitor already retired")
    }

    fn get_mut(&mut self, id: MonitorId) -> &mut Monitor {
        self.monitors[id.0 as usize].as_mut().expect("monitor already retired")
    }

    /// Reclaim a retired monitor's slot (spec.md §9 "Smart monitors").
    pub fn retire(&mut self, id: MonitorId) {
        self.monitors[id.0 as usize] = None;
    }

    /// `monitor_enter(o)` (spec.md §4.6): uncontended or re-entrant entry
    /// succeeds immediately; otherwise `thread` joins the wait-to-acquire
    /// queue and the caller must reschedule.
    pub fn enter(&mut self, id: MonitorId, thread: ThreadId) -> EnterOutcome {
        let m = self.get_mut(id);
        match m.owner {
            None => {
                m.owner = Some(thread);
                m.depth = 1;
                EnterOutcome::Acquired(1)
            }
            Some(owner) if owner == thread => {
                m.depth += 1;
                EnterOutcome::Acquired(m.depth)
            }
            Some(_) => {
                m.wait_to_acquire.push_back((thread, 1));
                EnterOutcome::Blocked
            }
        }
    }

    /// `monitor_exit(o)` (spec.md §4.6): decrement depth; on reaching
    /// zero, hand the monitor to the next waiter, restoring whatever
    /// depth it was queued with, or mark it unowned.
    ///
    /// # Errors
    /// [`VmError::BadMonitorState`] if `thread` does not own the monitor.
    pub fn exit(&mut self, id: MonitorId, thread: ThreadId, smart_monitors: bool) -> Result<ExitOutcome, VmError> {
        let m = self.get_mut(id);
        if m.owner != Some(thread) {
            return Err(VmError::BadMonitorState("exit by non-owner"));
        }
        m.depth -= 1;
        if m.depth > 0 {
            return Ok(ExitOutcome::StillHeld(m.depth));
        }
        let next_owner = m.wait_to_acquire.pop_front();
        match next_owner {
            Some((next, depth)) => {
                m.owner = Some(next);
                m.depth = depth;
            }
            None => {
                m.owner = None;
            }
        }
        let retireable = smart_monitors && next_owner.is_none() && !m.had_a_waiter;
        Ok(ExitOutcome::Released { next_owner: next_owner.map(|(t, _)| t), retireable })
    }

    /// `monitor_wait(o, delta)` (spec.md §4.6): `thread` must already own
    /// the monitor. Saves and returns the current depth, moves `thread`
    /// onto the condvar queue, and fully releases the monitor (handing
    /// it to the next waiter if any, restoring that waiter's own saved
    /// depth) so the caller can register a timer entry (if `delta > 0`)
    /// and reschedule. Reacquisition on wakeup — whether via
    /// [`Self::notify`] or timeout — re-enters through
    /// [`Self::reacquire`], which restores `saved_depth` rather than
    /// starting over at depth 1.
    ///
    /// # Errors
    /// [`VmError::BadMonitorState`] if `thread` does not own the monitor.
    pub fn wait(&mut self, id: MonitorId, thread: ThreadId) -> Result<(u32, ExitOutcome), VmError> {
        let m = self.get_mut(id);
        if m.owner != Some(thread) {
            return Err(VmError::BadMonitorState("wait by non-owner"));
        }
        let saved_depth = m.depth;
        m.had_a_waiter = true;
        m.condvar_queue.push_back((thread, saved_depth));

        // Release fully regardless of nesting depth: spec.md "releases
        // the monitor" on wait, reacquiring full depth on the way back
        // out. A monitor with a waiter can never be smart-retired.
        let next_owner = m.wait_to_acquire.pop_front();
        match next_owner {
            Some((next, depth)) => {
                m.owner = Some(next);
                m.depth = depth;
            }
            None => {
                m.owner = None;
                m.depth = 0;
            }
        }
        Ok((saved_depth, ExitOutcome::Released { next_owner: next_owner.map(|(t, _)| t), retireable: false }))
    }

    /// `monitor_notify(o, all?)` (spec.md §4.6): pop one (or all) threads
    /// from the condvar queue and move them to the wait-to-acquire queue,
    /// preserving each one's saved depth. Returns the released threads in
    /// condvar-queue (insertion) order, for the caller to cancel any
    /// outstanding timer entry.
    pub fn notify(&mut self, id: MonitorId, all: bool) -> Vec<ThreadId> {
        let m = self.get_mut(id);
        let mut released = Vec::new();
        let take = if all { m.condvar_queue.len() } else { m.condvar_queue.len().min(1) };
        for _ in 0..take {
            if let Some((t, depth)) = m.condvar_queue.pop_front() {
                m.wait_to_acquire.push_back((t, depth));
                released.push(t);
            }
        }
        released
    }

    /// A timed-out `monitor_wait` reacquiring the monitor (spec.md §4.6
    /// step 2 "attempt to reacquire a monitor"), restoring `depth`
    /// instead of starting fresh at depth 1. Used both for the timeout
    /// path and, equivalently, whenever a thread already carries a saved
    /// depth from an earlier `wait`.
    pub fn reacquire(&mut self, id: MonitorId, thread: ThreadId, depth: u32) -> EnterOutcome {
        let m = self.get_mut(id);
        match m.owner {
            None => {
                m.owner = Some(thread);
                m.depth = depth;
                EnterOutcome::Acquired(depth)
            }
            Some(_) => {
                m.wait_to_acquire.push_back((thread, depth));
                EnterOutcome::Blocked
            }
        }
    }

    /// Remove `thread` from a monitor's condvar queue, e.g. when its
    /// timed wait expires before any `notify` reached it. Returns the
    /// saved depth if `thread` was still waiting.
    pub fn remove_from_condvar(&mut self, id: MonitorId, thread: ThreadId) -> Option<u32> {
        let m = self.get_mut(id);
        let pos = m.condvar_queue.iter().position(|(t, _)| *t == thread)?;
        Some(m.condvar_queue.remove(pos).unwrap().1)
    }
}

/// Per-object association side table (spec.md §3 "ObjectAssociation"),
/// keyed by the object's address rather than threaded through the
/// object's header word (see module doc comment).
#[derive(Debug, Default)]
pub struct AssociationTable {
    associations: HashMap<Address, ObjectAssociation>,
}

impl AssociationTable {
    pub fn new() -> Self {
        AssociationTable { associations: HashMap::new() }
    }

    pub fn get(&self, object: Address) -> Option<&ObjectAssociation> {
        self.associations.get(&object)
    }

    pub fn get_mut(&mut self, object: Address) -> Option<&mut ObjectAssociation> {
        self.associations.get_mut(&object)
    }

    /// Inflate `object`'s association if it doesn't already have one,
    /// recording `class` at the association's class slot (spec.md §3:
    /// "the association stores the class pointer at the same offset the
    /// raw object would").
    pub fn get_or_create(&mut self, object: Address, class: Address) -> &mut ObjectAssociation {
        self.associations.entry(object).or_insert_with(|| ObjectAssociation::new(class))
    }

    /// Smart-monitor retirement (spec.md §9): drop the association
    /// entirely once its monitor is gone and it never took an identity
    /// hash, reclaiming the side-table slot.
    pub fn retire_if_unused(&mut self, object: Address) {
        if let Some(assoc) = self.associations.get(&object) {
            if assoc.is_retireable() {
                self.associations.remove(&object);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.associations.len()
    }
}
