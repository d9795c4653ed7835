//! Marking support (part of G): the reusable bitmap (B), the bounded
//! marking stack, the global root table, and stack-chunk scanning.

pub mod bitmap;
pub mod mark_queue;
pub mod roots;
pub mod stack_scan;

pub use bitmap::Bitmap;
pub use mark_queue::MarkQueue;
pub use roots::{RootHandle, RootTable};
pub use stack_scan::MethodMetadataProvider;
