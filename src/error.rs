//! VM error taxonomy (spec.md §7).
//!
//! Grounded on the teacher's `error.rs` (`FgcError`, `is_recoverable`/
//! `is_bug`) retargeted to spec.md's kinds rather than FGC's concurrent-GC
//! kinds. Out-of-memory is a single pre-allocated singleton
//! ([`VmError::out_of_memory`]) per spec.md §7/§9 — constructing it must
//! never itself allocate.

use thiserror::Error;

/// Why a [`VmError::Fatal`] was raised. Fatal errors terminate the VM;
/// they are never caught by in-language exception handling (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalReason {
    /// A collection was requested while another was already running, or
    /// while allocation was disabled for a reason other than GC itself.
    RecursiveCollection,
    /// A block's first header word did not classify under any of the
    /// three valid tags (spec.md §4.1, §8 invariant 7).
    InvalidHeaderTag,
    /// `W.prune(owned_by_isolate)` encountered a chunk whose owner was
    /// null; orphans must already have been pruned first.
    PruneOrderViolation,
    /// An object's class word decoded to a region tag outside `{1,2,3}`.
    InvalidRegionTag,
    /// Phase 2's per-layout dispatch reached a layout it cannot size.
    UnreachablePhase2Dispatch,
    /// The scheduler's timer queue and event table were both empty while
    /// the ready queue was also empty — nothing can ever make progress.
    SchedulerDeadlock,
    /// `new_stack` failed even immediately after a forced collection.
    StackExtensionFailed,
}

/// The error taxonomy of spec.md §7, as error *kinds* rather than
/// separate types — one enum, matching the teacher's single-`FgcError`
/// shape.
#[derive(Debug, Error)]
pub enum VmError {
    /// Unrecoverable allocation failure: M exhausted the young
    /// generation even after a collection, the NVM allocator is
    /// exhausted, or an array length does not fit the header's length
    /// field. Surfaced to the caller; never silently masked.
    #[error("out of memory")]
    OutOfMemory,

    /// An invariant violation unreachable by any well-formed program
    /// path. Aborts the VM without unwinding core state.
    #[error("fatal VM error: {0:?}")]
    Fatal(FatalReason),

    /// `monitor_exit`/`wait`/`notify` invoked by a thread that does not
    /// own the monitor. Recoverable; delivered through the normal
    /// in-language exception mechanism.
    #[error("bad monitor state: {0}")]
    BadMonitorState(&'static str),

    /// `start` on an already-started thread, `isolate_join` on self, a
    /// negative sleep or wait timeout.
    #[error("illegal thread state: {0}")]
    IllegalThreadState(&'static str),

    /// Propagated from the (external) loader when a class cannot be
    /// resolved mid-initialization.
    #[error("linkage error: {0}")]
    Linkage(String),
}

impl VmError {
    /// The single pre-allocated OOM sentinel (spec.md §7, §9): a
    /// well-known value, never constructed with any allocating payload.
    pub const fn out_of_memory() -> VmError {
        VmError::OutOfMemory
    }

    pub fn fatal(reason: FatalReason) -> VmError {
        VmError::Fatal(reason)
    }

    /// Whether this error is delivered through the normal in-language
    /// exception mechanism without disturbing the scheduler (spec.md §7
    /// "Propagation policy").
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VmError::BadMonitorState(_) | VmError::IllegalThreadState(_) | VmError::Linkage(_))
    }

    /// Whether this error must abort the VM rather than propagate.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VmError::Fatal(_))
    }
}

pub type Result<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_is_not_fatal_or_recoverable_exception() {
        let e = VmError::out_of_memory();
        assert!(!e.is_fatal());
        assert!(!e.is_recoverable());
    }

    #[test]
    fn fatal_errors_are_not_recoverable() {
        let e = VmError::fatal(FatalReason::RecursiveCollection);
        assert!(e.is_fatal());
        assert!(!e.is_recoverable());
    }

    #[test]
    fn monitor_and_thread_state_errors_are_recoverable() {
        assert!(VmError::BadMonitorState("exit without owning").is_recoverable());
        assert!(VmError::IllegalThreadState("already started").is_recoverable());
    }
}
