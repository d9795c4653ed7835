//! Relocation (spec.md §4.5.2, §4.5.4): computing every live object's new
//! address and moving it there, the second and fourth phases of a
//! collection cycle.

pub mod compaction;
pub mod forwarding;

pub use compaction::Compactor;
pub use forwarding::SliceTable;
