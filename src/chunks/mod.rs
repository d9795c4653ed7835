//! Stack Chunk Registry (W): the linked list of live activation stacks
//! (spec.md §3 "Stack Chunk", §4.3).

pub mod registry;
pub mod stack_chunk;

pub use registry::ChunkRegistry;
pub use stack_chunk::{Frame, StackChunk};
