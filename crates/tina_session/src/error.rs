//! Error types for render sessions

use thiserror::Error;
use tina_accel::AccelError;
use tina_geometry::GeometryError;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Pool operation failed
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// Hierarchy construction failed
    #[error("Hierarchy error: {0}")]
    Accel(#[from] AccelError),

    /// Invalid configuration
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text could not be parsed
    #[error("Failed to parse session configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The pool changed since the last successful rebuild
    #[error("Hierarchy is stale: rebuild after loading or deleting geometry")]
    HierarchyStale,
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
