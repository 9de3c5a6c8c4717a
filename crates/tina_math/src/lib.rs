//! # tina_math
//!
//! Copyable primitives shared by the geometry pool and the hierarchy:
//! vectors, axis-aligned boxes, rays, and the two intersection tests the
//! traversal kernel runs (slab and Möller–Trumbore).

pub mod bounds;
pub mod intersect;
pub mod ray;
pub mod vector;

pub use bounds::AABB;
pub use intersect::{interpolate_normal, interpolate_uv, ray_aabb, ray_triangle, TriangleHit};
pub use ray::Ray;
pub use vector::{Vec2, Vec3};

pub mod consts {
    /// Hits at or nearer than this distance are discarded
    pub const EPSILON: f32 = 1e-7;
}

pub mod prelude {
    pub use crate::{ray_aabb, ray_triangle, Ray, TriangleHit, Vec2, Vec3, AABB};
}
