//! # tina_session - Render Session
//!
//! Ties the geometry pool and the hierarchy together behind one lock:
//! - SessionConfig: buffer sizes and traversal options, loadable from JSON
//! - RenderSession: load/delete/rebuild in an exclusive phase, queries in a
//!   shared one
//! - SceneView: a held read phase for running many queries
//!
//! # Example
//!
//! ```
//! use tina_geometry::VertexRecord;
//! use tina_math::{Ray, Vec2, Vec3};
//! use tina_session::{RenderSession, SessionConfig};
//!
//! let session = RenderSession::new(SessionConfig::small()).unwrap();
//! session
//!     .load(&[
//!         VertexRecord::new(Vec3::new(-1.0, -1.0, 3.0), Vec3::NEG_Z, Vec2::ZERO),
//!         VertexRecord::new(Vec3::new(1.0, -1.0, 3.0), Vec3::NEG_Z, Vec2::ZERO),
//!         VertexRecord::new(Vec3::new(0.0, 1.0, 3.0), Vec3::NEG_Z, Vec2::ZERO),
//!     ])
//!     .unwrap();
//! session.rebuild().unwrap();
//!
//! let hit = session.intersect(&Ray::new(Vec3::ZERO, Vec3::Z), None).unwrap();
//! assert!(hit.found);
//! assert_eq!(hit.triangle, 0);
//! ```

pub mod config;
pub mod error;
pub mod session;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use session::{RenderSession, SceneView, SessionStats, SurfacePoint};

pub mod prelude {
    pub use crate::{RenderSession, SceneView, SessionConfig};
    pub use crate::{Result, SessionError};
    pub use tina_accel::Hit;
    pub use tina_geometry::{ObjectHandle, VertexRecord};
}
