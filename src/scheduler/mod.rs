//! Scheduler & Monitor Layer (S): a cooperative, single-threaded
//! round-robin scheduler with priorities, timers, events, monitors, and
//! isolate hibernation (spec.md §4.6).
//!
//! No teacher analogue — the teacher's GC has no scheduler of its own.
//! [`Scheduler`] is the one struct that owns every piece described in
//! §4.6 (the thread table, [`ReadyQueue`], [`TimerQueue`], [`EventTable`],
//! [`MonitorTable`], [`AssociationTable`], [`HibernationRegistry`]) and
//! wires them together exactly the way §4.6's prose describes
//! `reschedule_next`/`reschedule`; the submodules hold the individual
//! data structures so each can be grounded and tested in isolation.

pub mod event_table;
pub mod hibernate;
pub mod monitor;
pub mod ready_queue;
pub mod thread;
pub mod timer_queue;

pub use event_table::{EventId, EventTable};
pub use hibernate::{HibernatedIsolate, HibernatedReadyThread, HibernationRegistry};
pub use monitor::{AssociationTable, EnterOutcome, ExitOutcome, Monitor, MonitorTable};
pub use ready_queue::ReadyQueue;
pub use thread::{BlockReason, HibernatedAs, IsolateId, Thread, ThreadId, ThreadState, MAX_PRIORITY, MIN_PRIORITY, NORMAL_PRIORITY};
pub use timer_queue::{TimerEntry, TimerKind, TimerQueue};

use crate::chunks::registry::ChunkRegistry;
use crate::error::{FatalReason, VmError};
use crate::memory::address::Address;
use crate::object::association::MonitorId;

/// The channel-I/O side of the scheduler's main loop (spec.md §6 "Channel
/// I/O ↔ Core"): an external collaborator the scheduler polls
/// non-blockingly and, failing that, blocks on with a bounded timeout.
pub trait EventSource {
    /// Non-blocking: an event that has already arrived, if any.
    fn poll_event(&mut self) -> Option<EventId>;
    /// Block for up to `timeout` (`None` meaning forever) for the next
    /// event to arrive.
    fn wait_for_event(&mut self, timeout: Option<std::time::Duration>) -> Option<EventId>;
}

/// The external primitive that actually moves the CPU from one thread's
/// stack to another's (spec.md §4.6 "Context switch" step 3), entirely
/// outside this crate's concern.
pub trait ThreadSwitch {
    fn switch_to(&mut self, next: ThreadId);
}

/// S: the scheduler. Owns every live thread's state plus the four queues
/// and two side tables spec.md §4.6 describes, and the pending-virtual-
/// monitor side list (spec.md §4.6 "Pending virtual monitors").
#[derive(Debug, Default)]
pub struct Scheduler {
    threads: Vec<Thread>,
    ready: ReadyQueue,
    timers: TimerQueue,
    events: EventTable,
    monitors: MonitorTable,
    associations: AssociationTable,
    hibernation: HibernationRegistry,
    current: Option<ThreadId>,
    pending_virtual_monitors: Vec<(ThreadId, Address, Address)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn current(&self) -> Option<ThreadId> {
        self.current
    }

    pub fn get(&self, id: ThreadId) -> &Thread {
        self.thread(id)
    }

    fn thread(&self, id: ThreadId) -> &Thread {
        &self.threads[id.0 as usize]
    }

    fn thread_mut(&mut self, id: ThreadId) -> &mut Thread {
        &mut self.threads[id.0 as usize]
    }

    /// Put `id` back onto the ready queue at its own priority and mark it
    /// runnable. The common "this thread may now run again" operation
    /// behind timers firing, monitors being handed over, events arriving,
    /// and joins completing.
    fn make_ready(&mut self, id: ThreadId) {
        let priority = self.thread(id).priority;
        self.thread_mut(id).state = ThreadState::Alive;
        self.ready.enqueue(priority, id);
    }

    /// Create a new thread in the `New` state. Does not make it runnable;
    /// the caller must still `start` it.
    pub fn spawn(&mut self, isolate: IsolateId, priority: u8) -> ThreadId {
        let id = ThreadId(self.threads.len() as u32);
        self.threads.push(Thread::new(id, isolate, priority));
        id
    }

    /// `start`: `new → ALIVE` (spec.md §4.6 state diagram).
    ///
    /// # Errors
    /// [`VmError::IllegalThreadState`] if `id` has already been started.
    pub fn start(&mut self, id: ThreadId) -> Result<(), VmError> {
        if !matches!(self.thread(id).state, ThreadState::New) {
            return Err(VmError::IllegalThreadState("start on an already-started thread"));
        }
        self.make_ready(id);
        Ok(())
    }

    /// Voluntary yield: the current thread gives up its slot and rejoins
    /// the ready queue at its own priority.
    pub fn yield_now(&mut self) {
        if let Some(current) = self.current {
            self.make_ready(current);
        }
    }

    /// `sleep(delta)`: parks `thread` on the timer queue for `delta_ms`.
    pub fn sleep(&mut self, thread: ThreadId, delta_ms: u64, now_ms: u64) {
        self.thread_mut(thread).state = ThreadState::Blocked(BlockReason::Sleeping);
        self.timers.insert(TimerEntry { wake_at_ms: now_ms + delta_ms, thread, kind: TimerKind::Sleep });
    }

    /// `join`: blocks `thread` until `target` is `DEAD`, or returns
    /// immediately if it already is.
    ///
    /// # Errors
    /// [`VmError::IllegalThreadState`] if `thread == target`.
    pub fn join(&mut self, thread: ThreadId, target: ThreadId) -> Result<(), VmError> {
        if thread == target {
            return Err(VmError::IllegalThreadState("a thread cannot join itself"));
        }
        if self.thread(target).is_dead() {
            return Ok(());
        }
        self.thread_mut(target).joiners.push(thread);
        self.thread_mut(thread).state = ThreadState::Blocked(BlockReason::Joining(target));
        Ok(())
    }

    /// `run → DEAD`: marks `thread` dead and wakes every thread parked in
    /// `join` on it.
    pub fn exit_thread(&mut self, thread: ThreadId) {
        self.thread_mut(thread).state = ThreadState::Dead;
        let joiners = std::mem::take(&mut self.thread_mut(thread).joiners);
        for joiner in joiners {
            self.make_ready(joiner);
        }
        if self.current == Some(thread) {
            self.current = None;
        }
    }

    /// Cancellation (spec.md §4.6 "Cancellation"): interrupts `thread` out
    /// of a sleep or join, waking it early so the caller can raise an
    /// interrupted exception on its behalf.
    ///
    /// # Errors
    /// [`VmError::IllegalThreadState`] if `thread` is not currently
    /// sleeping or joining.
    pub fn interrupt(&mut self, thread: ThreadId) -> Result<(), VmError> {
        match self.thread(thread).state {
            ThreadState::Blocked(BlockReason::Sleeping) => {
                self.timers.remove_for_thread(thread);
                self.make_ready(thread);
                Ok(())
            }
            ThreadState::Blocked(BlockReason::Joining(target)) => {
                if let Some(pos) = self.thread(target).joiners.iter().position(|j| *j == thread) {
                    self.thread_mut(target).joiners.remove(pos);
                }
                self.make_ready(thread);
                Ok(())
            }
            _ => Err(VmError::IllegalThreadState("thread is not sleeping or joining")),
        }
    }

    /// `wait_for_event`: parks `thread` on the event table until `event`
    /// arrives.
    pub fn block_on_event(&mut self, thread: ThreadId, event: EventId) {
        self.events.block_on(event, thread);
        self.thread_mut(thread).state = ThreadState::Blocked(BlockReason::WaitingForEvent(event));
    }

    fn signal_event(&mut self, event: EventId) {
        if let Some(thread) = self.events.signal(event) {
            self.make_ready(thread);
        }
    }

    // --- Monitors, indexed by `MonitorId` directly -----------------

    pub fn alloc_monitor(&mut self) -> MonitorId {
        self.monitors.alloc()
    }

    /// `monitor_enter(o)` once `o`'s monitor id is already known.
    pub fn monitor_enter(&mut self, monitor: MonitorId, thread: ThreadId) -> EnterOutcome {
        let outcome = self.monitors.enter(monitor, thread);
        if let EnterOutcome::Blocked = outcome {
            self.thread_mut(thread).state = ThreadState::Blocked(BlockReason::EnteringMonitor(monitor));
        }
        outcome
    }

    /// `monitor_exit(o)`. Handing the monitor to a waiter makes it
    /// runnable again; retirement of a now-unused association/monitor is
    /// the caller's decision (spec.md §9 "Smart monitors"), reported via
    /// [`ExitOutcome::retireable`] — see [`Self::object_monitor_exit`] for
    /// the object-indexed entry point that acts on it directly.
    pub fn monitor_exit(&mut self, monitor: MonitorId, thread: ThreadId, smart_monitors: bool) -> Result<ExitOutcome, VmError> {
        let outcome = self.monitors.exit(monitor, thread, smart_monitors)?;
        if let ExitOutcome::Released { next_owner: Some(next), .. } = outcome {
            self.make_ready(next);
        }
        Ok(outcome)
    }

    /// `monitor_wait(o, delta)`.
    pub fn monitor_wait(
        &mut self,
        monitor: MonitorId,
        thread: ThreadId,
        timeout_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<(), VmError> {
        let (saved_depth, outcome) = self.monitors.wait(monitor, thread)?;
        if let ExitOutcome::Released { next_owner: Some(next), .. } = outcome {
            self.make_ready(next);
        }
        self.thread_mut(thread).state = ThreadState::Blocked(BlockReason::Waiting(monitor, saved_depth));
        if let Some(delta) = timeout_ms {
            self.timers.insert(TimerEntry {
                wake_at_ms: now_ms + delta,
                thread,
                kind: TimerKind::TimedWait { monitor, depth: saved_depth },
            });
        }
        Ok(())
    }

    /// `monitor_notify(o, all?)`.
    ///
    /// # Errors
    /// [`VmError::BadMonitorState`] if `thread` does not own the monitor.
    pub fn monitor_notify(&mut self, monitor: MonitorId, thread: ThreadId, all: bool) -> Result<(), VmError> {
        if self.monitors.get(monitor).owner != Some(thread) {
            return Err(VmError::BadMonitorState("notify by non-owner"));
        }
        let released = self.monitors.notify(monitor, all);
        for t in &released {
            self.timers.remove_for_thread(*t);
        }
        if !released.is_empty() {
            self.yield_now();
        }
        Ok(())
    }

    // --- Monitors, indexed by object address (lazy inflation) ------

    fn monitor_for(&mut self, object: Address, class: Address) -> MonitorId {
        match self.associations.get(object).and_then(|a| a.monitor()) {
            Some(id) => id,
            None => {
                let id = self.monitors.alloc();
                self.associations.get_or_create(object, class).set_monitor(Some(id));
                id
            }
        }
    }

    /// `monitor_enter(o)`, inflating `o`'s association/monitor on first
    /// use (spec.md §3 "Association").
    pub fn object_monitor_enter(&mut self, thread: ThreadId, object: Address, class: Address) -> EnterOutcome {
        let monitor = self.monitor_for(object, class);
        self.monitor_enter(monitor, thread)
    }

    /// `monitor_exit(o)`. Retires the monitor and, if now unused, the
    /// whole association (spec.md §9 "Smart monitors").
    ///
    /// # Errors
    /// [`VmError::BadMonitorState`] if `o` has no monitor or `thread`
    /// does not own it.
    pub fn object_monitor_exit(&mut self, thread: ThreadId, object: Address, smart_monitors: bool) -> Result<ExitOutcome, VmError> {
        let monitor = self
            .associations
            .get(object)
            .and_then(|a| a.monitor())
            .ok_or(VmError::BadMonitorState("exit on an object with no inflated monitor"))?;
        let outcome = self.monitor_exit(monitor, thread, smart_monitors)?;
        if let ExitOutcome::Released { retireable: true, .. } = outcome {
            self.monitors.retire(monitor);
            if let Some(assoc) = self.associations.get_mut(object) {
                assoc.set_monitor(None);
            }
            self.associations.retire_if_unused(object);
        }
        Ok(outcome)
    }

    /// `monitor_wait(o, delta)`.
    pub fn object_monitor_wait(
        &mut self,
        thread: ThreadId,
        object: Address,
        timeout_ms: Option<u64>,
        now_ms: u64,
    ) -> Result<(), VmError> {
        let monitor = self
            .associations
            .get(object)
            .and_then(|a| a.monitor())
            .ok_or(VmError::BadMonitorState("wait on an object with no inflated monitor"))?;
        self.monitor_wait(monitor, thread, timeout_ms, now_ms)
    }

    /// `monitor_notify(o, all?)`.
    pub fn object_monitor_notify(&mut self, thread: ThreadId, object: Address, all: bool) -> Result<(), VmError> {
        let monitor = self
            .associations
            .get(object)
            .and_then(|a| a.monitor())
            .ok_or(VmError::BadMonitorState("notify on an object with no inflated monitor"))?;
        self.monitor_notify(monitor, thread, all)
    }

    /// The interpreter's uncontended fast path records the object rather
    /// than allocating a monitor up front (spec.md §4.6 "Pending virtual
    /// monitors"); [`Self::reschedule`] inflates every entry belonging to
    /// the outgoing thread before it ever switches away.
    pub fn record_pending_virtual_monitor(&mut self, thread: ThreadId, object: Address, class: Address) {
        self.pending_virtual_monitors.push((thread, object, class));
    }

    fn inflate_pending_virtual_monitors(&mut self, thread: ThreadId) {
        let mine: Vec<(Address, Address)> = self
            .pending_virtual_monitors
            .iter()
            .filter(|(t, _, _)| *t == thread)
            .map(|(_, object, class)| (*object, *class))
            .collect();
        self.pending_virtual_monitors.retain(|(t, _, _)| *t != thread);
        for (object, class) in mine {
            self.object_monitor_enter(thread, object, class);
        }
    }

    // --- Main loop ---------------------------------------------------

    fn wake_timer(&mut self, entry: TimerEntry) {
        match entry.kind {
            TimerKind::Sleep => self.make_ready(entry.thread),
            TimerKind::TimedWait { monitor, depth } => {
                // `monitor_notify` already removes the timer entry for any
                // thread it releases, so reaching here with the thread
                // still on the condvar queue only happens on a genuine
                // timeout.
                if self.monitors.remove_from_condvar(monitor, entry.thread).is_some() {
                    match self.monitors.reacquire(monitor, entry.thread, depth) {
                        EnterOutcome::Acquired(_) => self.make_ready(entry.thread),
                        EnterOutcome::Blocked => {
                            // Stays `Blocked(Waiting(monitor, depth))` until
                            // a future `monitor_exit` hands it ownership.
                        }
                    }
                }
            }
        }
    }

    /// `reschedule_next` (spec.md §4.6): the scheduler's main loop.
    ///
    /// # Errors
    /// [`VmError::Fatal`]`(`[`FatalReason::SchedulerDeadlock`]`)` if the
    /// ready queue, timer queue, and event table are simultaneously empty
    /// — nothing could ever make progress again.
    pub fn reschedule_next(&mut self, clock: &dyn Fn() -> u64, events: &mut dyn EventSource) -> Result<ThreadId, VmError> {
        loop {
            while let Some(event) = events.poll_event() {
                self.signal_event(event);
            }

            let due = self.timers.drain_due(clock());
            for entry in due {
                self.wake_timer(entry);
            }

            if let Some(next) = self.ready.dequeue() {
                self.current = Some(next);
                self.thread_mut(next).state = ThreadState::Alive;
                return Ok(next);
            }

            if let Some(wake_at) = self.timers.next_wake_at() {
                let timeout_ms = wake_at.saturating_sub(clock());
                if let Some(event) = events.wait_for_event(Some(std::time::Duration::from_millis(timeout_ms))) {
                    self.signal_event(event);
                }
                continue;
            }

            if !self.events.is_empty() {
                if let Some(event) = events.wait_for_event(None) {
                    self.signal_event(event);
                }
                continue;
            }

            return Err(VmError::fatal(FatalReason::SchedulerDeadlock));
        }
    }

    /// `reschedule` (spec.md §4.6): inflate pending virtual monitors owned
    /// by the outgoing thread, pick the next thread, and perform the
    /// actual stack switch through the external [`ThreadSwitch`]
    /// primitive.
    pub fn reschedule(
        &mut self,
        clock: &dyn Fn() -> u64,
        events: &mut dyn EventSource,
        switch: &mut dyn ThreadSwitch,
    ) -> Result<ThreadId, VmError> {
        if let Some(current) = self.current {
            self.inflate_pending_virtual_monitors(current);
        }
        let next = self.reschedule_next(clock, events)?;
        switch.switch_to(next);
        Ok(next)
    }

    // --- Hibernation ---------------------------------------------------

    /// Move every alive thread of `isolate` out of the live ready/timer
    /// queues and into a [`HibernatedIsolate`] record, pruning their
    /// stack chunks out of `chunks` along the way (spec.md §4.6
    /// "Hibernation"). Pre-empts `self.current` if it belongs to this
    /// isolate.
    pub fn hibernate_isolate(&mut self, isolate: IsolateId, chunks: &mut ChunkRegistry, now_ms: u64) {
        let member_ids: Vec<ThreadId> =
            self.threads.iter().filter(|t| t.isolate == isolate && t.is_alive()).map(|t| t.id).collect();

        let mut state = HibernatedIsolate::new();
        for &id in &member_ids {
            let priority = self.thread(id).priority;
            let timer = self.timers.remove_for_thread(id);
            let was_ready = self.ready.remove(id);

            let hibernated_as = match &timer {
                Some(entry) => {
                    let remaining_ms = entry.wake_at_ms.saturating_sub(now_ms);
                    match entry.kind {
                        TimerKind::Sleep => HibernatedAs::Sleeping { remaining_ms },
                        TimerKind::TimedWait { monitor, depth } => HibernatedAs::TimedWaiting { monitor, depth, remaining_ms },
                    }
                }
                None => HibernatedAs::Ready,
            };

            if was_ready {
                state.ready.push(HibernatedReadyThread { thread: id, priority });
            }
            if let Some(entry) = timer {
                let remaining_ms = entry.wake_at_ms.saturating_sub(now_ms);
                state.timers.push((entry, remaining_ms));
            }

            self.thread_mut(id).state = ThreadState::Hibernated(hibernated_as);
            if self.current == Some(id) {
                self.current = None;
            }
        }

        state.chunks = chunks.prune_owned_by(|t| member_ids.contains(&t));
        self.hibernation.insert(isolate, state);
    }

    /// Reverse of [`Self::hibernate_isolate`]: restores every thread to
    /// the ready or timer queue, re-anchoring timer deltas to `now_ms`,
    /// and rejoins the pruned stack chunks into `chunks`.
    pub fn unhibernate_isolate(&mut self, isolate: IsolateId, chunks: &mut ChunkRegistry, now_ms: u64) {
        let Some(state) = self.hibernation.take(isolate) else { return };

        for r in state.ready {
            self.thread_mut(r.thread).state = ThreadState::Alive;
            self.ready.enqueue(r.priority, r.thread);
        }

        for (entry, remaining_ms) in state.timers {
            let block_reason = match entry.kind {
                TimerKind::Sleep => BlockReason::Sleeping,
                TimerKind::TimedWait { monitor, depth } => BlockReason::Waiting(monitor, depth),
            };
            self.thread_mut(entry.thread).state = ThreadState::Blocked(block_reason);
            self.timers.insert(TimerEntry { wake_at_ms: now_ms + remaining_ms, thread: entry.thread, kind: entry.kind });
        }

        chunks.append(state.chunks);
    }

    /// Isolate abort (spec.md §4.6 "Cancellation"): marks every non-dead
    /// thread of `isolate` exited and drains it out of every live queue
    /// it might be sitting in.
    pub fn abort_isolate(&mut self, isolate: IsolateId) {
        let member_ids: Vec<ThreadId> =
            self.threads.iter().filter(|t| t.isolate == isolate && !t.is_dead()).map(|t| t.id).collect();
        for id in member_ids {
            self.ready.remove(id);
            self.timers.remove_for_thread(id);
            self.events.cancel(id);
            self.exit_thread(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::stack_chunk::StackChunk;
    use std::cell::Cell;

    struct NullEvents;
    impl EventSource for NullEvents {
        fn poll_event(&mut self) -> Option<EventId> {
            None
        }
        fn wait_for_event(&mut self, _timeout: Option<std::time::Duration>) -> Option<EventId> {
            None
        }
    }

    struct NullSwitch(Vec<ThreadId>);
    impl ThreadSwitch for NullSwitch {
        fn switch_to(&mut self, next: ThreadId) {
            self.0.push(next);
        }
    }

    fn clock_at(ms: u64) -> impl Fn() -> u64 {
        move || ms
    }

    #[test]
    fn equal_priority_threads_round_robin_in_arrival_order() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        let b = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.start(b).unwrap();

        let mut events = NullEvents;
        let clock = clock_at(0);
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), a);
        s.yield_now();
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), b);
    }

    #[test]
    fn higher_priority_thread_preempts_the_ready_queue() {
        let mut s = Scheduler::new();
        let low = s.spawn(IsolateId(0), 2);
        let high = s.spawn(IsolateId(0), 8);
        s.start(low).unwrap();
        s.start(high).unwrap();

        let mut events = NullEvents;
        let clock = clock_at(0);
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), high);
    }

    #[test]
    fn sleeping_thread_wakes_once_its_timer_is_due() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        let mut events = NullEvents;
        let clock0 = clock_at(0);
        assert_eq!(s.reschedule_next(&clock0, &mut events).unwrap(), a);

        s.sleep(a, 10, 0);
        assert!(matches!(s.get(a).state, ThreadState::Blocked(BlockReason::Sleeping)));

        let now = Cell::new(10u64);
        let clock = || now.get();
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), a);
        assert!(matches!(s.get(a).state, ThreadState::Alive));
    }

    #[test]
    fn empty_scheduler_is_a_fatal_deadlock() {
        let mut s = Scheduler::new();
        let mut events = NullEvents;
        let clock = clock_at(0);
        let err = s.reschedule_next(&clock, &mut events).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn join_wakes_on_target_exit() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        let b = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.start(b).unwrap();

        s.join(b, a).unwrap();
        assert!(matches!(s.get(b).state, ThreadState::Blocked(BlockReason::Joining(_))));
        assert!(!s.ready.remove(b)); // b is not on the ready queue

        s.exit_thread(a);
        assert!(matches!(s.get(b).state, ThreadState::Alive));
    }

    #[test]
    fn joining_a_dead_thread_returns_immediately() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        let b = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.exit_thread(a);
        s.start(b).unwrap();
        s.join(b, a).unwrap();
        assert!(matches!(s.get(b).state, ThreadState::Alive));
    }

    #[test]
    fn timed_out_monitor_wait_reacquires_and_restores_depth() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        let b = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.start(b).unwrap();
        let obj = Address::new(0x1000);
        let class = Address::new(0x10);

        assert_eq!(s.object_monitor_enter(a, obj, class), EnterOutcome::Acquired(1));
        s.object_monitor_enter(a, obj, class); // depth 2, re-entrant
        s.object_monitor_wait(a, obj, Some(10), 0).unwrap();
        assert!(matches!(s.get(a).state, ThreadState::Blocked(BlockReason::Waiting(_, 2))));

        let now = Cell::new(10u64);
        let clock = || now.get();
        let mut events = NullEvents;
        // b is ready; it must run first, then a wakes from its timeout.
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), b);
        s.yield_now();
        assert_eq!(s.reschedule_next(&clock, &mut events).unwrap(), a);

        let monitor = s.associations.get(obj).unwrap().monitor().unwrap();
        assert_eq!(s.monitors.get(monitor).depth, 2);
        assert_eq!(s.monitors.get(monitor).owner, Some(a));
    }

    #[test]
    fn notify_hands_the_monitor_to_the_woken_thread_on_exit() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        let b = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.start(b).unwrap();
        let obj = Address::new(0x2000);
        let class = Address::new(0x10);

        s.object_monitor_enter(a, obj, class);
        s.object_monitor_wait(a, obj, None, 0).unwrap();
        s.object_monitor_enter(b, obj, class); // b now owns it
        s.object_monitor_notify(b, obj, false).unwrap();
        s.object_monitor_exit(b, obj, true).unwrap();

        assert!(matches!(s.get(a).state, ThreadState::Alive));
        let monitor = s.associations.get(obj).unwrap().monitor().unwrap();
        assert_eq!(s.monitors.get(monitor).owner, Some(a));
    }

    #[test]
    fn pending_virtual_monitor_inflates_before_the_next_switch() {
        let mut s = Scheduler::new();
        let a = s.spawn(IsolateId(0), NORMAL_PRIORITY);
        s.start(a).unwrap();
        let mut events = NullEvents;
        let clock = clock_at(0);
        s.reschedule_next(&clock, &mut events).unwrap();

        let obj = Address::new(0x3000);
        s.record_pending_virtual_monitor(a, obj, Address::new(0x10));
        assert!(s.associations.get(obj).is_none());

        let mut switch = NullSwitch(Vec::new());
        s.yield_now();
        s.reschedule(&clock, &mut events, &mut switch).unwrap();
        assert!(s.associations.get(obj).is_some());
        assert_eq!(s.associations.get(obj).unwrap().monitor().and_then(|m| s.monitors.get(m).owner), Some(a));
    }

    #[test]
    fn hibernate_then_unhibernate_restores_ready_and_timer_threads() {
        let mut s = Scheduler::new();
        let iso = IsolateId(7);
        let ready_thread = s.spawn(iso, NORMAL_PRIORITY);
        let sleeping_thread = s.spawn(iso, NORMAL_PRIORITY);
        s.start(ready_thread).unwrap();
        s.start(sleeping_thread).unwrap();
        s.sleep(sleeping_thread, 100, 0);

        let mut chunks = ChunkRegistry::new();
        let mut chunk_a = StackChunk::new();
        chunk_a.owner = Some(ready_thread);
        let mut chunk_b = StackChunk::new();
        chunk_b.owner = Some(sleeping_thread);
        chunks.add(chunk_a);
        chunks.add(chunk_b);

        s.hibernate_isolate(iso, &mut chunks, 10);
        assert_eq!(chunks.count(), 0);
        assert!(matches!(s.get(ready_thread).state, ThreadState::Hibernated(HibernatedAs::Ready)));
        assert!(matches!(
            s.get(sleeping_thread).state,
            ThreadState::Hibernated(HibernatedAs::Sleeping { remaining_ms: 90 })
        ));

        s.unhibernate_isolate(iso, &mut chunks, 1000);
        assert_eq!(chunks.count(), 2);
        assert!(matches!(s.get(ready_thread).state, ThreadState::Alive));
        assert!(matches!(s.get(sleeping_thread).state, ThreadState::Blocked(BlockReason::Sleeping)));
        assert_eq!(s.timers.next_wake_at(), Some(1090));
    }

    #[test]
    fn abort_isolate_kills_every_member_thread() {
        let mut s = Scheduler::new();
        let iso = IsolateId(3);
        let a = s.spawn(iso, NORMAL_PRIORITY);
        let b = s.spawn(iso, NORMAL_PRIORITY);
        s.start(a).unwrap();
        s.start(b).unwrap();
        s.sleep(b, 50, 0);

        s.abort_isolate(iso);
        assert!(s.get(a).is_dead());
        assert!(s.get(b).is_dead());
        assert!(s.timers.is_empty());
    }
}
