//! Low-level memory primitives (L): typed addresses and raw word access
//! over the arena that backs the whole heap.

pub mod address;
pub mod raw;

pub use address::{Address, Offset, UWord, WORD_BITS, WORD_BYTES};
