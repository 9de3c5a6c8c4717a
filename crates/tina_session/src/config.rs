//! Session configuration

use serde::{Deserialize, Serialize};
use tina_accel::{required_capacity, MAX_CAPACITY};
use tina_memory::PlacementPolicy;

use crate::error::{Result, SessionError};

/// Render session configuration
///
/// Every buffer is sized once from these values and never grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Vertex records in the geometry pool (three per triangle)
    pub vertex_capacity: usize,

    /// Objects that can be live at once
    pub object_capacity: usize,

    /// Node slots in the hierarchy, a power of two
    pub tree_capacity: usize,

    /// Placement policy for vertex blocks
    pub placement: PlacementPolicy,

    /// Ignore triangles seen from behind
    pub cull_backfaces: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vertex_capacity: 1 << 20,
            object_capacity: 64,
            tree_capacity: 1 << 20,
            placement: PlacementPolicy::FirstFit,
            cull_backfaces: false,
        }
    }
}

impl SessionConfig {
    /// Small buffers for tests and tools
    pub fn small() -> Self {
        Self {
            vertex_capacity: 3 * 1024,
            object_capacity: 16,
            tree_capacity: 4096,
            ..Default::default()
        }
    }

    /// Buffers sized to hold exactly `triangles` triangles in one tree
    pub fn for_triangles(triangles: usize) -> Self {
        Self {
            vertex_capacity: (triangles * 3).max(3),
            tree_capacity: required_capacity(triangles),
            ..Default::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every capacity is usable
    pub fn validate(&self) -> Result<()> {
        if self.vertex_capacity == 0 {
            return Err(SessionError::InvalidConfig("vertex_capacity must be non-zero".into()));
        }
        if self.vertex_capacity / 3 > u32::MAX as usize {
            return Err(SessionError::InvalidConfig(format!(
                "vertex_capacity {} exceeds u32 triangle indices",
                self.vertex_capacity
            )));
        }
        if self.object_capacity == 0 {
            return Err(SessionError::InvalidConfig("object_capacity must be non-zero".into()));
        }
        if self.object_capacity > u32::MAX as usize {
            return Err(SessionError::InvalidConfig(format!(
                "object_capacity {} exceeds u32 slots",
                self.object_capacity
            )));
        }
        if self.tree_capacity < 2
            || !self.tree_capacity.is_power_of_two()
            || self.tree_capacity > MAX_CAPACITY
        {
            return Err(SessionError::InvalidConfig(format!(
                "tree_capacity {} must be a power of two between 2 and {}",
                self.tree_capacity, MAX_CAPACITY
            )));
        }
        Ok(())
    }

    /// Set the vertex pool capacity
    pub fn with_vertex_capacity(mut self, capacity: usize) -> Self {
        self.vertex_capacity = capacity;
        self
    }

    /// Set the object capacity
    pub fn with_object_capacity(mut self, capacity: usize) -> Self {
        self.object_capacity = capacity;
        self
    }

    /// Set the hierarchy node capacity
    pub fn with_tree_capacity(mut self, capacity: usize) -> Self {
        self.tree_capacity = capacity;
        self
    }

    /// Set the block placement policy
    pub fn with_placement(mut self, placement: PlacementPolicy) -> Self {
        self.placement = placement;
        self
    }

    /// Enable or disable backface culling
    pub fn with_cull_backfaces(mut self, cull: bool) -> Self {
        self.cull_backfaces = cull;
        self
    }
}
