//! # tina_accel - Triangle BVH
//!
//! Spatial hierarchy for nearest-hit ray queries:
//! - Median split on the largest axis into an implicit binary tree
//! - Fixed node budget, no growth after construction
//! - Iterative traversal with a 64-entry array stack
//!
//! The tree stores boxes and primitive ids only. Triangle vertices are read
//! through [`TriangleSource`] at the leaves, so the same tree can be queried
//! against any storage that numbers triangles the same way.

pub mod bvh;
pub mod error;
pub mod node;
pub mod stack;
pub mod traverse;

pub use bvh::{required_capacity, BuildStats, Bvh, MAX_CAPACITY};
pub use error::{AccelError, Result};
pub use node::{BvhNode, NodeTag, PackedNode, ROOT};
pub use stack::{TraversalStack, STACK_SIZE};
pub use traverse::{Hit, TriangleSource};

pub mod prelude {
    pub use crate::{BuildStats, Bvh, Hit, TriangleSource};
    pub use crate::{AccelError, Result};
}
