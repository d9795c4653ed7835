//! Memory Manager (M): allocation, NVM, and read-only object memories.

pub mod bump;
pub mod manager;
pub mod nvm;
pub mod romfs;

pub use bump::BumpAllocator;
pub use manager::{AllocationDisabledGuard, MemoryManager};
pub use nvm::NvmAllocator;
pub use romfs::{ObjectMemory, RomRegistry};
