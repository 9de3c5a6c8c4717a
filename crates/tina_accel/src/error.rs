//! Error types for hierarchy construction

use thiserror::Error;

/// Hierarchy errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccelError {
    /// The fixed node array cannot hold the tree for this many primitives
    #[error("Tree too small: {primitives} primitives need {required} node slots, capacity is {capacity}")]
    TreeTooSmall {
        primitives: usize,
        required: usize,
        capacity: usize,
    },

    /// A primitive box has min > max (or NaN) on some axis
    #[error("Invalid bounds for primitive {primitive}")]
    InvalidBounds { primitive: u32 },

    /// Capacity is not a power of two >= 2 addressable with u32 node ids
    #[error("Invalid tree capacity: {0}")]
    InvalidCapacity(usize),

    /// A packed node could not be restored
    #[error("Malformed node {node}: {reason}")]
    MalformedNode { node: usize, reason: String },
}

/// Result type for hierarchy operations
pub type Result<T> = std::result::Result<T, AccelError>;
