//! W: the registry of live stack chunks (spec.md §4.3).
//!
//! The spec describes an intrusive singly linked list threaded through
//! each chunk's own `next` meta slot. This crate instead holds chunks in
//! a `Vec<StackChunk>` indexed by a stable handle — the collector and
//! scheduler never need pointer identity, only "is this chunk still
//! registered" and "walk every registered chunk", both of which a `Vec`
//! gives directly, in the teacher's own collection-wrapper idiom (see
//! `marker::mark_queue`'s `VecDeque` wrapping).

use super::stack_chunk::{StackChunk, ThreadId};

/// A stable handle into the registry, returned by [`ChunkRegistry::add`].
/// Not reused after a chunk is pruned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkHandle(usize);

/// The stack chunk registry (W).
#[derive(Debug, Default)]
pub struct ChunkRegistry {
    chunks: Vec<Option<StackChunk>>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        ChunkRegistry { chunks: Vec::new() }
    }

    /// Push `chunk` onto the registry.
    ///
    /// # Panics
    /// Debug-asserts the chunk is not already present by handle identity
    /// (callers only ever hold one handle per chunk, so this cannot
    /// actually happen outside of a caller bug).
    pub fn add(&mut self, chunk: StackChunk) -> ChunkHandle {
        let handle = ChunkHandle(self.chunks.len());
        self.chunks.push(Some(chunk));
        handle
    }

    pub fn count(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count()
    }

    pub fn get(&self, handle: ChunkHandle) -> Option<&StackChunk> {
        self.chunks.get(handle.0).and_then(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, handle: ChunkHandle) -> Option<&mut StackChunk> {
        self.chunks.get_mut(handle.0).and_then(|c| c.as_mut())
    }

    /// Every chunk currently registered, with its handle.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkHandle, &StackChunk)> {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ChunkHandle(i), c)))
    }

    /// Remove every chunk whose owner is `None` (orphans). Must run
    /// before [`Self::prune_owned_by`], which asserts non-null owners.
    pub fn prune_orphans(&mut self) -> Vec<StackChunk> {
        self.prune(|c| c.is_orphan())
    }

    /// Remove every chunk owned by a thread the caller judges to belong
    /// to the isolate being pruned (e.g. during hibernation or isolate
    /// exit). `owned_by` decides membership from the chunk's owner.
    ///
    /// # Panics
    /// Debug-asserts every removed chunk has a non-null owner — orphans
    /// must already have been pruned by [`Self::prune_orphans`].
    pub fn prune_owned_by(&mut self, mut owned_by: impl FnMut(ThreadId) -> bool) -> Vec<StackChunk> {
        self.prune(|c| c.owner.map(&mut owned_by).unwrap_or(false))
    }

    fn prune(&mut self, mut predicate: impl FnMut(&StackChunk) -> bool) -> Vec<StackChunk> {
        let mut removed = Vec::new();
        for slot in &mut self.chunks {
            let matches = slot.as_ref().map(|c| predicate(c)).unwrap_or(false);
            if matches {
                if let Some(chunk) = slot.take() {
                    removed.push(chunk);
                }
            }
        }
        removed
    }

    /// Rejoin a previously pruned sublist.
    ///
    /// # Panics
    /// Debug-asserts every appended chunk has a non-null owner.
    pub fn append(&mut self, sublist: Vec<StackChunk>) {
        for chunk in sublist {
            debug_assert!(chunk.owner.is_some(), "appended chunk must have a non-null owner");
            self.chunks.push(Some(chunk));
        }
    }
}
