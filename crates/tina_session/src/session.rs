//! Render session
//!
//! Owns one geometry pool and the hierarchy built over it. Access is split
//! into two phases behind a single read-write lock:
//! - Mutation (load, delete, rebuild) takes the write lock
//! - Queries take the read lock and may run on many threads at once
//!
//! Any change to the pool marks the hierarchy stale. Queries against a stale
//! hierarchy are refused until [`RenderSession::rebuild`] succeeds.

use std::time::Instant;

use parking_lot::{RwLock, RwLockReadGuard};
use tina_accel::{BuildStats, Bvh, Hit, PackedNode};
use tina_geometry::{GeometryPool, ObjectHandle, Triangle, VertexRecord};
use tina_math::{Ray, Vec2, Vec3};
use tina_memory::{BlockStats, SlotStats};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Pool and hierarchy, always locked together
#[derive(Debug)]
struct Scene {
    pool: GeometryPool,
    bvh: Bvh,
    stale: bool,
}

/// Explicit context for one scene's geometry and acceleration structure
#[derive(Debug)]
pub struct RenderSession {
    config: SessionConfig,
    scene: RwLock<Scene>,
}

impl RenderSession {
    /// Create a session with every buffer allocated up front
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let pool = GeometryPool::with_policy(
            config.vertex_capacity,
            config.object_capacity,
            config.placement,
        );
        let bvh = Bvh::new(config.tree_capacity)?;

        log::debug!(
            "Render session: {} vertices, {} objects, {} tree nodes",
            config.vertex_capacity,
            config.object_capacity,
            config.tree_capacity
        );

        Ok(Self {
            config,
            scene: RwLock::new(Scene {
                pool,
                bvh,
                stale: true,
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Mutation phase
    // ========================================================================

    /// Load an object; the hierarchy must be rebuilt before the next query
    pub fn load(&self, records: &[VertexRecord]) -> Result<ObjectHandle> {
        let mut scene = self.scene.write();
        let handle = scene.pool.load(records)?;
        scene.stale = true;
        Ok(handle)
    }

    /// Load an object from packed floats, eight per vertex
    pub fn load_floats(&self, floats: &[f32]) -> Result<ObjectHandle> {
        let mut scene = self.scene.write();
        let handle = scene.pool.load_floats(floats)?;
        scene.stale = true;
        Ok(handle)
    }

    /// Allocate a zeroed object to be filled with [`import`](Self::import)
    pub fn reserve(&self, vertex_count: usize) -> Result<ObjectHandle> {
        let mut scene = self.scene.write();
        let handle = scene.pool.reserve(vertex_count)?;
        scene.stale = true;
        Ok(handle)
    }

    /// Overwrite an object's records
    pub fn import(&self, handle: ObjectHandle, records: &[VertexRecord]) -> Result<()> {
        let mut scene = self.scene.write();
        scene.pool.import(handle, records)?;
        scene.stale = true;
        Ok(())
    }

    /// Copy an object's records out
    pub fn export(&self, handle: ObjectHandle) -> Result<Vec<VertexRecord>> {
        Ok(self.scene.read().pool.export(handle)?)
    }

    /// Delete an object
    pub fn delete(&self, handle: ObjectHandle) -> Result<()> {
        let mut scene = self.scene.write();
        scene.pool.delete(handle)?;
        scene.stale = true;
        Ok(())
    }

    /// Delete every object and drop the hierarchy
    pub fn clear(&self) {
        let mut scene = self.scene.write();
        scene.pool.clear();
        scene.bvh.clear();
        scene.stale = false;
    }

    /// Rebuild the hierarchy over every live triangle
    ///
    /// On failure the previous hierarchy is kept and stays stale.
    pub fn rebuild(&self) -> Result<BuildStats> {
        let mut scene = self.scene.write();
        let start = Instant::now();

        let bounds = scene.pool.triangle_bounds();
        let stats = scene.bvh.build_indexed(&bounds)?;
        scene.stale = false;

        log::info!(
            "Rebuilt hierarchy: {} triangles, {} nodes, depth {} in {:.2?}",
            stats.primitives,
            stats.nodes(),
            stats.depth,
            start.elapsed()
        );

        Ok(stats)
    }

    // ========================================================================
    // Query phase
    // ========================================================================

    /// Check whether the pool changed since the last rebuild
    pub fn is_stale(&self) -> bool {
        self.scene.read().stale
    }

    /// Hold the read lock for a batch of queries
    pub fn view(&self) -> Result<SceneView<'_>> {
        let scene = self.scene.read();
        if scene.stale {
            return Err(SessionError::HierarchyStale);
        }
        Ok(SceneView {
            scene,
            cull_backfaces: self.config.cull_backfaces,
        })
    }

    /// Nearest triangle along `ray`, skipping `exclude`
    pub fn intersect(&self, ray: &Ray, exclude: Option<u32>) -> Result<Hit> {
        Ok(self.view()?.intersect(ray, exclude))
    }

    /// One nearest-hit query per `(ray, exclude)` pair, in input order
    pub fn intersect_many(&self, queries: &[(Ray, Option<u32>)]) -> Result<Vec<Hit>> {
        Ok(self.view()?.intersect_many(queries))
    }

    /// Hierarchy nodes in upload layout
    pub fn packed_nodes(&self) -> Vec<PackedNode> {
        self.scene.read().bvh.packed_nodes()
    }

    /// Run `f` over the pool's backing buffer as packed floats
    pub fn with_floats<R>(&self, f: impl FnOnce(&[f32]) -> R) -> R {
        f(self.scene.read().pool.as_floats())
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        let scene = self.scene.read();
        SessionStats {
            objects: scene.pool.object_count(),
            vertices: scene.pool.total_vertex_count(),
            triangles: scene.pool.total_triangle_count(),
            blocks: scene.pool.block_stats(),
            slots: scene.pool.slot_stats(),
            hierarchy: scene.bvh.stats(),
            hierarchy_version: scene.bvh.version(),
            stale: scene.stale,
        }
    }
}

/// Read access to a session whose hierarchy is current
///
/// Holds the read lock, so no load, delete or rebuild can start until it is
/// dropped.
pub struct SceneView<'a> {
    scene: RwLockReadGuard<'a, Scene>,
    cull_backfaces: bool,
}

impl<'a> SceneView<'a> {
    /// Nearest triangle along `ray`, skipping `exclude`
    pub fn intersect(&self, ray: &Ray, exclude: Option<u32>) -> Hit {
        let scene = &*self.scene;
        scene
            .bvh
            .intersect_with(ray, &scene.pool, exclude, self.cull_backfaces)
    }

    /// One nearest-hit query per `(ray, exclude)` pair, in input order
    pub fn intersect_many(&self, queries: &[(Ray, Option<u32>)]) -> Vec<Hit> {
        let scene = &*self.scene;
        scene
            .bvh
            .intersect_many(queries, &scene.pool, self.cull_backfaces)
    }

    /// Read a triangle with all attributes
    pub fn triangle_at(&self, index: u32) -> Result<Triangle> {
        Ok(self.scene.pool.triangle_at(index)?)
    }

    /// Interpolated surface attributes at a hit, or None for a miss
    pub fn shade_attributes(&self, ray: &Ray, hit: &Hit) -> Result<Option<SurfacePoint>> {
        if !hit.found {
            return Ok(None);
        }

        let triangle = self.triangle_at(hit.triangle)?;
        let bary = hit.barycentric();
        Ok(Some(SurfacePoint {
            position: ray.at(hit.distance),
            normal: triangle.normal_at(bary),
            face_normal: triangle.face_normal(),
            texcoord: triangle.texcoord_at(bary),
        }))
    }

    pub fn pool(&self) -> &GeometryPool {
        &self.scene.pool
    }

    pub fn bvh(&self) -> &Bvh {
        &self.scene.bvh
    }
}

/// Surface attributes handed to shading
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub position: Vec3,
    /// Interpolated vertex normal
    pub normal: Vec3,
    /// Geometric normal from the winding order
    pub face_normal: Vec3,
    pub texcoord: Vec2,
}

/// Session statistics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionStats {
    pub objects: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub blocks: BlockStats,
    pub slots: SlotStats,
    pub hierarchy: BuildStats,
    pub hierarchy_version: u32,
    pub stale: bool,
}
