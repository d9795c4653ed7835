//! squawk-core: the memory manager (M), mark-compact collector (G), and
//! cooperative scheduler (S) of an embedded-class bytecode VM.
//!
//! Grounded on the teacher's crate root (`Fgc`, the single struct tying
//! the concurrent collector's allocator/marker/relocate pieces together
//! for its own test harness), retargeted to a single-threaded `Vm` that
//! owns M, G, and S and is the one place in the crate allowed to hold
//! all three mutably at once (spec.md §9 "implementers should pass a
//! `Vm` object as context rather than relying on implicit globals").
//! `Vm` is intentionally not `Send`/`Sync`: this crate has no atomics and
//! no background threads (see DESIGN.md's "single-threaded departure"
//! entry).

pub mod allocator;
pub mod chunks;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod gc;
pub mod marker;
pub mod memory;
pub mod object;
pub mod relocate;
pub mod scheduler;
pub mod stats;
pub mod trace;
pub mod util;

use std::time::Duration;

use allocator::manager::MemoryManager;
use chunks::registry::ChunkRegistry;
use config::RuntimeConfig;
use error::VmError;
use finalizer::FinalizerRegistry;
use gc::{CollectionReport, Gc, GraphCopy};
use marker::roots::RootTable;
use marker::stack_scan::MethodMetadataProvider;
use memory::address::{Address, WORD_BYTES};
use object::klass::ClassMetadataProvider;
use object::layout::Layout;
use scheduler::{EventSource, Scheduler, ThreadSwitch};
use trace::{GcEvent, GcTracer};

/// The suite-image control block G's [`gc::Gc::copy_object_graph`]
/// produces: a self-contained word stream with every reference already
/// rewritten to an in-stream offset, plus a parallel bit-per-word map of
/// which words are references (spec.md §4.5.8, SPEC_FULL.md §6). Writing
/// it to `squawk.reloc` or any other sink is the embedder's concern; this
/// crate only produces the bytes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SuiteImage {
    pub bytes: Vec<u8>,
    pub oop_bitmap: Vec<u8>,
}

impl From<GraphCopy> for SuiteImage {
    fn from(copy: GraphCopy) -> Self {
        SuiteImage { bytes: copy.bytes, oop_bitmap: copy.oop_bitmap }
    }
}

/// The VM core: owns M, G, and S plus the shared state every phase of a
/// collection or a scheduler suspension point needs to touch
/// (`RootTable`, `ChunkRegistry`, `FinalizerRegistry`), and the class
/// loader's metadata providers it was built with.
///
/// Not `Send`/`Sync` (see module doc comment); embedders drive one `Vm`
/// per OS thread if they need more than one VM instance at all.
pub struct Vm<C, M>
where
    C: ClassMetadataProvider,
    M: MethodMetadataProvider,
{
    mm: MemoryManager,
    gc: Gc,
    scheduler: Scheduler,
    roots: RootTable,
    chunks: ChunkRegistry,
    finalizers: FinalizerRegistry,
    config: RuntimeConfig,
    tracer: GcTracer,
    classes: C,
    methods: M,
}

impl<C, M> Vm<C, M>
where
    C: ClassMetadataProvider,
    M: MethodMetadataProvider,
{
    pub fn new(
        heap_bytes: usize,
        nvm_bytes: usize,
        stack_words_budget: usize,
        config: RuntimeConfig,
        classes: C,
        methods: M,
    ) -> Result<Self, config::ConfigError> {
        config.validate()?;
        let mm = MemoryManager::new(heap_bytes, nvm_bytes, stack_words_budget);
        let heap_words = mm.heap_end().diff(mm.heap_start()).as_bytes() as usize / WORD_BYTES;
        let tracer = GcTracer::new(config.gc_trace_flags, config.gc_trace_threshold);
        Ok(Vm {
            gc: Gc::new(mm.heap_start(), heap_words),
            mm,
            scheduler: Scheduler::new(),
            roots: RootTable::new(),
            chunks: ChunkRegistry::new(),
            finalizers: FinalizerRegistry::new(),
            config,
            tracer,
            classes,
            methods,
        })
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.mm
    }

    pub fn memory_mut(&mut self) -> &mut MemoryManager {
        &mut self.mm
    }

    pub fn roots_mut(&mut self) -> &mut RootTable {
        &mut self.roots
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkRegistry {
        &mut self.chunks
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn finalizers_mut(&mut self) -> &mut FinalizerRegistry {
        &mut self.finalizers
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// `allocate` (spec.md §4.4): serve straight from M; on failure drive
    /// one collection and retry once, failing with
    /// [`VmError::OutOfMemory`] if the retry also fails. Excessive-GC
    /// mode runs a collection before every attempt regardless.
    pub fn allocate(&mut self, class_ptr: Address, layout: Layout, body_words: usize, array_length: Option<u64>) -> Result<Address, VmError> {
        if self.mm.excessive_gc() {
            self.collect_garbage(false);
        }
        if let Some(oop) = self.mm.try_allocate(class_ptr, layout, body_words, array_length) {
            self.tracer.emit(self.gc.cycle_count(), GcEvent::Allocation { bytes: body_words * WORD_BYTES });
            return Ok(oop);
        }
        self.collect_garbage(false);
        self.mm
            .try_allocate(class_ptr, layout, body_words, array_length)
            .inspect(|_| self.tracer.emit(self.gc.cycle_count(), GcEvent::Allocation { bytes: body_words * WORD_BYTES }))
            .ok_or_else(VmError::out_of_memory)
    }

    /// `new_stack(words)` (spec.md §4.4): never drives G; the caller
    /// retries after an explicit [`Self::collect_garbage`] on failure.
    pub fn new_stack(&mut self, words: usize) -> bool {
        self.mm.new_stack(words)
    }

    /// Drive one collection cycle, disabling allocation for its duration
    /// (spec.md §4.4 "Allocation-enabled flag") and draining any
    /// finalizers it promotes into the scheduler's finalizer-runner queue.
    pub fn collect_garbage(&mut self, force_full: bool) -> CollectionReport {
        let gc = &mut self.gc;
        let chunks = &mut self.chunks;
        let roots = &mut self.roots;
        let classes = &self.classes;
        let methods = &self.methods;
        let finalizers = &mut self.finalizers;
        let config = &self.config;
        let tracer = &self.tracer;
        self.mm.with_allocation_disabled(|mm| gc.collect(mm, chunks, roots, classes, methods, finalizers, config, tracer, force_full))
    }

    /// `VM.collect_garbage` (spec.md §4.4, §6): the explicit user-facing
    /// request, gated by [`RuntimeConfig::allow_user_gc`].
    ///
    /// # Errors
    /// [`VmError::Linkage`] is never returned here; a disabled explicit
    /// GC request is reported as [`VmError::IllegalThreadState`] since it
    /// is a caller-policy violation, not a VM bug.
    pub fn request_collection(&mut self, force_full: bool) -> Result<CollectionReport, VmError> {
        if !self.config.allow_user_gc {
            return Err(VmError::IllegalThreadState("explicit collection requests are disabled"));
        }
        Ok(self.collect_garbage(force_full))
    }

    /// Pop every finalizer G promoted across past collections, handing
    /// them to the caller (the embedder's finalizer-runner loop, spec.md
    /// §4.5.6) one at a time.
    pub fn next_pending_finalizer(&mut self) -> Option<Address> {
        self.finalizers.next_pending()
    }

    /// `copy_object_graph` (spec.md §4.5.8): serialize everything
    /// reachable from `roots` into a [`SuiteImage`]. Same atomicity
    /// contract as a collection: no allocation, no thread switch.
    pub fn copy_object_graph(&mut self, roots: &[Address]) -> SuiteImage {
        self.mm.with_allocation_disabled(|mm| self.gc.copy_object_graph(mm, &self.classes, roots, &self.tracer).into())
    }

    /// `reschedule` (spec.md §4.6): consults
    /// [`MemoryManager::safe_to_switch_threads`] before ever invoking the
    /// scheduler, since a thread switch must never interleave with a
    /// mid-mutation M or G.
    ///
    /// # Errors
    /// [`VmError::Fatal`] if the scheduler deadlocks (spec.md §4.6 step
    /// 4); [`VmError::BadMonitorState`] (wrapped as a fatal scheduling
    /// error) if called while allocation is disabled, which would mean G
    /// or an allocator critical section tried to switch threads.
    pub fn reschedule(
        &mut self,
        clock: &dyn Fn() -> u64,
        events: &mut dyn EventSource,
        switch: &mut dyn ThreadSwitch,
    ) -> Result<scheduler::ThreadId, VmError> {
        if !self.mm.safe_to_switch_threads() {
            return Err(VmError::fatal(error::FatalReason::RecursiveCollection));
        }
        self.scheduler.reschedule(clock, events, switch)
    }
}

/// A timeout expressed in milliseconds, converted at the [`EventSource`]
/// boundary since the scheduler's internal queues are simplest to reason
/// about as plain integers (spec.md §4.6's timer queue is sorted by a
/// plain "absolute time").
pub fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::klass::{Klass, KlassFlags, MethodRef, OopMap, StaticFieldSize};
    use std::collections::HashMap;

    struct Classes(HashMap<Address, Klass>);
    impl ClassMetadataProvider for Classes {
        fn klass(&self, class_ptr: Address) -> &Klass {
            &self.0[&class_ptr]
        }
    }

    struct NoMethods;
    impl MethodMetadataProvider for NoMethods {
        fn oop_map(&self, _method: MethodRef) -> &OopMap {
            unreachable!("no stack chunks in these tests")
        }
    }

    fn leaf_klass() -> Klass {
        Klass {
            id: 1,
            flags: KlassFlags::REFERENCE,
            super_class: None,
            interfaces: Vec::new(),
            instance_oop_map: OopMap::all_primitive(1),
            instance_size_words: 1,
            static_fields: StaticFieldSize { reference_words: 0, primitive_words: 0 },
            vtable: Vec::new(),
            layout: Layout::Instance,
            array_element_kind: None,
        }
    }

    fn test_vm() -> Vm<Classes, NoMethods> {
        let class_ptr = Address::new(0x10);
        let mut classes = HashMap::new();
        classes.insert(class_ptr, leaf_klass());
        Vm::new(4096, 256, 64, RuntimeConfig::default(), Classes(classes), NoMethods).unwrap()
    }

    #[test]
    fn allocate_serves_directly_when_there_is_room() {
        let mut vm = test_vm();
        let class_ptr = Address::new(0x10);
        let oop = vm.allocate(class_ptr, Layout::Instance, 1, None).unwrap();
        assert_eq!(vm.memory().allocation_pointer().diff(vm.memory().heap_start()).as_bytes(), 16);
        let _ = oop;
    }

    #[test]
    fn allocate_collects_and_retries_before_failing_oom() {
        let mut vm = test_vm();
        let class_ptr = Address::new(0x10);
        // Exhaust the young generation so the first bump fails; nothing
        // is rooted, so the retry's collection reclaims everything and
        // the allocation still succeeds afterward.
        loop {
            if vm.memory_mut().try_allocate(class_ptr, Layout::Instance, 1, None).is_none() {
                break;
            }
        }
        let report_before = vm.gc.cycle_count();
        let result = vm.allocate(class_ptr, Layout::Instance, 1, None);
        assert!(result.is_ok());
        assert!(vm.gc.cycle_count() > report_before);
    }

    #[test]
    fn request_collection_is_refused_when_disabled_by_config() {
        let mut vm = Vm::new(
            4096,
            256,
            64,
            RuntimeConfig { allow_user_gc: false, ..RuntimeConfig::default() },
            Classes(HashMap::new()),
            NoMethods,
        )
        .unwrap();
        let err = vm.request_collection(true).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn suite_image_round_trips_through_json() {
        let mut vm = test_vm();
        let class_ptr = Address::new(0x10);
        let oop = vm.allocate(class_ptr, Layout::Instance, 1, None).unwrap();
        let root = vm.roots_mut().register(oop);
        let _ = root;
        let image = vm.copy_object_graph(&[oop]);
        let json = serde_json::to_string(&image).unwrap();
        let restored: SuiteImage = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.bytes, image.bytes);
        assert_eq!(restored.oop_bitmap, image.oop_bitmap);
    }

}
