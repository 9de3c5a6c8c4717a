//! # tina_geometry - Geometry Pool
//!
//! Flat vertex storage shared by every object in a scene:
//! - VertexRecord: position, normal and texcoord packed as 8 floats
//! - GeometryPool: per-object blocks over one fixed array, addressed by
//!   generational handles
//! - Global triangle indexing that the hierarchy builds and traverses over
//!
//! # Example
//!
//! ```
//! use tina_geometry::{GeometryPool, VertexRecord};
//! use tina_math::{Vec2, Vec3};
//!
//! let mut pool = GeometryPool::new(1024, 8);
//! let tri = [
//!     VertexRecord::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO),
//!     VertexRecord::new(Vec3::X, Vec3::Z, Vec2::new(1.0, 0.0)),
//!     VertexRecord::new(Vec3::Y, Vec3::Z, Vec2::new(0.0, 1.0)),
//! ];
//! let handle = pool.load(&tri).unwrap();
//! assert_eq!(pool.total_triangle_count(), 1);
//! pool.delete(handle).unwrap();
//! ```

pub mod error;
pub mod handle;
pub mod pool;
pub mod vertex;

pub use error::{GeometryError, Result};
pub use handle::ObjectHandle;
pub use pool::GeometryPool;
pub use vertex::{Triangle, VertexRecord};

pub mod prelude {
    pub use crate::{GeometryPool, ObjectHandle, Triangle, VertexRecord};
    pub use crate::{GeometryError, Result};
}
