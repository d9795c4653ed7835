//! Object header layout (H): the three disjoint block tags, the
//! forwarding encoding G reads and writes, class descriptors, and the
//! per-object association indirection.

pub mod association;
pub mod header;
pub mod klass;
pub mod layout;

pub use association::{MonitorId, ObjectAssociation};
pub use header::{BlockTag, ClassWord, Region};
pub use klass::{ArrayElementKind, ClassMetadataProvider, Klass, KlassFlags, MethodRef, OopMap};
pub use layout::Layout;
