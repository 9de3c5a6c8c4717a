//! Error types for the geometry pool

use thiserror::Error;
use tina_memory::MemoryError;

use crate::handle::ObjectHandle;

/// Geometry pool errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Allocator failure while creating an object
    #[error("Allocation failed: {0}")]
    Memory(#[from] MemoryError),

    /// Vertex count is zero or not a multiple of 3
    #[error("Invalid vertex count {0}: must be a non-zero multiple of 3")]
    InvalidVertexCount(usize),

    /// Flat float input is not a whole number of vertex records
    #[error("Invalid float count {0}: must be a multiple of 8")]
    InvalidFloatCount(usize),

    /// Handle was deleted, or its slot has been reused
    #[error("Stale object handle {0}")]
    StaleHandle(ObjectHandle),

    /// Bulk write length differs from the object's vertex count
    #[error("Length mismatch: object holds {expected} vertices, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Triangle index at or past the addressable span
    #[error("Triangle {index} out of range (span {span})")]
    TriangleOutOfRange { index: u32, span: u32 },

    /// Triangle index inside the span but in no live object
    #[error("Triangle {0} does not belong to a live object")]
    TriangleNotLive(u32),
}

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;
