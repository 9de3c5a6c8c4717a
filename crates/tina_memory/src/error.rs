//! Error types for the allocators

use thiserror::Error;

/// Allocator errors
///
/// Capacity errors report both the request and what was available, since the
/// fix is always to resize the fixed buffers rather than to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// No free range and no untouched capacity large enough
    #[error("Out of space: requested {requested} elements, largest free range is {largest_free} (capacity {capacity})")]
    OutOfSpace {
        requested: usize,
        largest_free: usize,
        capacity: usize,
    },

    /// Every slot is issued
    #[error("Out of slots: all {capacity} slots are in use")]
    OutOfSlots { capacity: usize },

    /// Release of an offset that is not the start of a live block
    #[error("Invalid offset: {0} is not a live block")]
    InvalidOffset(usize),

    /// Release of a slot that is out of range or not issued
    #[error("Invalid handle: slot {0} is not live")]
    InvalidHandle(u32),

    /// Zero-length block requested
    #[error("Cannot allocate a zero-length block")]
    ZeroLength,
}

/// Result type for allocator operations
pub type Result<T> = std::result::Result<T, MemoryError>;
