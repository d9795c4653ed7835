//! GC trace logging (ambient; SPEC_FULL.md §4.8).
//!
//! Grounded on the teacher's `logging.rs` (`GcEvent`, level-gated
//! console/JSON dual-format logger), retargeted to route everything
//! through the `log` crate facade — an embedded VM core has no business
//! deciding how its embedder renders a log line, unlike a server-class
//! collector that owns its own console.

use crate::config::GcTraceFlags;

/// One event `gc` may report, gated by [`GcTraceFlags`] and the
/// configured trace threshold (spec.md §6 "GC trace threshold/flags").
#[derive(Debug, Clone, Copy)]
pub enum GcEvent<'a> {
    CycleStart { cycle: u64, full: bool },
    CycleEnd { cycle: u64, bytes_reclaimed: usize, pause_micros: u64 },
    Allocation { bytes: usize },
    HeapStats { ap: usize, yge: usize, heap_end: usize },
    GraphCopy { object_count: usize, bytes: usize },
    FinalizerRun { object: &'a str },
}

impl GcEvent<'_> {
    fn flag(&self) -> GcTraceFlags {
        match self {
            GcEvent::CycleStart { .. } | GcEvent::CycleEnd { .. } => GcTraceFlags::COLLECTION,
            GcEvent::Allocation { .. } => GcTraceFlags::ALLOCATION,
            GcEvent::HeapStats { .. } => GcTraceFlags::HEAP,
            GcEvent::GraphCopy { .. } => GcTraceFlags::GRAPH_COPY,
            GcEvent::FinalizerRun { .. } => GcTraceFlags::BASIC,
        }
    }
}

/// Gates [`GcEvent`]s by the configured flags and the collection-count
/// threshold before forwarding to the `log` facade.
#[derive(Debug, Default)]
pub struct GcTracer {
    flags: GcTraceFlags,
    threshold: u32,
}

impl GcTracer {
    pub fn new(flags: GcTraceFlags, threshold: u32) -> Self {
        GcTracer { flags, threshold }
    }

    fn enabled(&self, cycle: u64, event: &GcEvent<'_>) -> bool {
        cycle >= self.threshold as u64 && self.flags.contains(event.flag())
    }

    /// Emit `event` if gating allows it. `cycle` is the current
    /// collection count, consulted against the trace threshold.
    pub fn emit(&self, cycle: u64, event: GcEvent<'_>) {
        if !self.enabled(cycle, &event) {
            return;
        }
        match event {
            GcEvent::CycleStart { cycle, full } => {
                log::info!("gc cycle {cycle} start (full={full})");
            }
            GcEvent::CycleEnd { cycle, bytes_reclaimed, pause_micros } => {
                log::info!("gc cycle {cycle} end: reclaimed {bytes_reclaimed} bytes in {pause_micros}us");
            }
            GcEvent::Allocation { bytes } => {
                log::trace!("allocate {bytes} bytes");
            }
            GcEvent::HeapStats { ap, yge, heap_end } => {
                log::debug!("heap ap={ap:#x} yge={yge:#x} heap_end={heap_end:#x}");
            }
            GcEvent::GraphCopy { object_count, bytes } => {
                log::info!("copied object graph: {object_count} objects, {bytes} bytes");
            }
            GcEvent::FinalizerRun { object } => {
                log::debug!("running finalizer for {object}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_suppresses_early_cycles() {
        let tracer = GcTracer::new(GcTraceFlags::COLLECTION, 3);
        assert!(!tracer.enabled(0, &GcEvent::CycleStart { cycle: 0, full: false }));
        assert!(tracer.enabled(3, &GcEvent::CycleStart { cycle: 3, full: false }));
    }

    #[test]
    fn flags_gate_unrelated_event_categories() {
        let tracer = GcTracer::new(GcTraceFlags::HEAP, 0);
        assert!(!tracer.enabled(0, &GcEvent::Allocation { bytes: 8 }));
        assert!(tracer.enabled(0, &GcEvent::HeapStats { ap: 0, yge: 0, heap_end: 0 }));
    }
}
