//! # tina_memory - Fixed-Capacity Allocators
//!
//! Bookkeeping allocators for flat, pre-sized storage:
//! - BlockAllocator: contiguous element ranges with free-list reuse
//! - SlotAllocator: integer handles in `[0, N)`, lowest free first
//!
//! Neither allocator owns the storage it manages. Callers keep the backing
//! buffer and use the offsets/slots handed out here to index into it.

pub mod block;
pub mod slot;
pub mod error;

pub use block::{BlockAllocator, BlockStats, PlacementPolicy};
pub use slot::{SlotAllocator, SlotStats};
pub use error::{MemoryError, Result};

/// Common capacity accounting shared by both allocators
pub trait Allocator {
    /// Get the total capacity (elements for blocks, handles for slots)
    fn capacity(&self) -> usize;

    /// Get the amount currently handed out
    fn used(&self) -> usize;

    /// Get the amount still available
    fn available(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Reset the allocator, releasing everything
    fn reset(&mut self);
}

pub mod prelude {
    pub use crate::{Allocator, BlockAllocator, SlotAllocator, PlacementPolicy};
    pub use crate::{MemoryError, Result};
}
