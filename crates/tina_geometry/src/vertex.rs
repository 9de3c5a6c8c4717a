//! Vertex records and triangles

use tina_math::{interpolate_normal, interpolate_uv, Vec2, Vec3, AABB};

/// GPU-ready vertex record
///
/// Eight packed floats: position, normal, texcoord. Objects are runs of
/// these, three per triangle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
}

impl VertexRecord {
    /// Size in bytes
    pub const SIZE: usize = core::mem::size_of::<Self>();
    /// Floats per record
    pub const FLOATS: usize = 8;

    pub fn new(position: Vec3, normal: Vec3, texcoord: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            texcoord: texcoord.to_array(),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    #[inline]
    pub fn texcoord(&self) -> Vec2 {
        Vec2::from_array(self.texcoord)
    }
}

/// Three consecutive vertex records read from the pool
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [VertexRecord; 3],
}

impl Triangle {
    pub fn new(v0: VertexRecord, v1: VertexRecord, v2: VertexRecord) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Corner positions
    pub fn positions(&self) -> [Vec3; 3] {
        self.vertices.map(|v| v.position())
    }

    /// Axis-aligned box of the three positions
    pub fn bounding_box(&self) -> AABB {
        AABB::from_points(&self.positions())
    }

    /// Geometric normal from the winding order
    pub fn face_normal(&self) -> Vec3 {
        let [p0, p1, p2] = self.positions();
        (p1 - p0).cross(p2 - p0).normalize()
    }

    /// Shading normal at barycentric `[w, u, v]`
    pub fn normal_at(&self, bary: [f32; 3]) -> Vec3 {
        let [a, b, c] = self.vertices.map(|v| v.normal());
        interpolate_normal(a, b, c, bary)
    }

    /// Texture coordinate at barycentric `[w, u, v]`
    pub fn texcoord_at(&self, bary: [f32; 3]) -> Vec2 {
        let [a, b, c] = self.vertices.map(|v| v.texcoord());
        interpolate_uv(a, b, c, bary)
    }
}
