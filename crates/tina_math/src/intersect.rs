//! Ray intersection tests
//!
//! `ray_aabb` prunes subtrees during traversal and `ray_triangle` runs at the
//! leaves. Both take the ray by reference and allocate nothing.

use crate::bounds::AABB;
use crate::consts::EPSILON;
use crate::ray::Ray;
use crate::vector::{Vec2, Vec3};

/// Where a ray meets a triangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray, always greater than `EPSILON`
    pub distance: f32,
    /// Weight of the second vertex
    pub u: f32,
    /// Weight of the third vertex
    pub v: f32,
}

impl TriangleHit {
    #[inline]
    pub fn uv(&self) -> [f32; 2] {
        [self.u, self.v]
    }

    /// All three vertex weights as `[1 - u - v, u, v]`
    #[inline]
    pub fn barycentric(&self) -> [f32; 3] {
        [1.0 - self.u - self.v, self.u, self.v]
    }
}

/// Slab test
///
/// Returns the parametric interval `(entry, exit)` over which the ray is
/// inside `aabb`. `entry` is clamped to 0, so an origin inside the box enters
/// at 0. `None` when the ray misses or the box is entirely behind the origin.
///
/// An axis the ray does not move along is decided by position alone. This
/// keeps `0 * inf` out of the arithmetic for rays grazing a flat box.
pub fn ray_aabb(ray: &Ray, aabb: &AABB) -> Option<(f32, f32)> {
    let mut entry = 0.0f32;
    let mut exit = f32::INFINITY;

    for axis in 0..3 {
        let o = ray.origin.axis(axis);
        let d = ray.direction.axis(axis);
        let (lo, hi) = (aabb.min.axis(axis), aabb.max.axis(axis));

        if d == 0.0 {
            if !(lo..=hi).contains(&o) {
                return None;
            }
            continue;
        }

        let (t_lo, t_hi) = ((lo - o) / d, (hi - o) / d);
        entry = entry.max(t_lo.min(t_hi));
        exit = exit.min(t_lo.max(t_hi));
        if entry > exit {
            return None;
        }
    }

    Some((entry, exit))
}

/// Möller–Trumbore ray/triangle test
///
/// With `cull_backface` set, triangles whose `(v1 - v0) x (v2 - v0)` winding
/// faces away from the ray are skipped. Hits at or closer than `EPSILON` are
/// rejected so a ray leaving a surface does not hit that surface again.
pub fn ray_triangle(
    ray: &Ray,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    cull_backface: bool,
) -> Option<TriangleHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = ray.direction.cross(e2);
    let det = e1.dot(p);

    // Degenerate or edge-on, relative to the triangle's own scale
    if det.abs() <= EPSILON * e1.length() * e2.length() || (cull_backface && det < 0.0) {
        return None;
    }
    let inv_det = 1.0 / det;

    let to_origin = ray.origin - v0;
    let u = to_origin.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = to_origin.cross(e1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let distance = e2.dot(q) * inv_det;
    (distance > EPSILON).then_some(TriangleHit { distance, u, v })
}

/// Blend three vertex normals by `bary` and renormalize
pub fn interpolate_normal(n0: Vec3, n1: Vec3, n2: Vec3, bary: [f32; 3]) -> Vec3 {
    let [w0, w1, w2] = bary;
    (n0 * w0 + n1 * w1 + n2 * w2).normalize()
}

pub fn interpolate_uv(uv0: Vec2, uv1: Vec2, uv2: Vec2, bary: [f32; 3]) -> Vec2 {
    let [w0, w1, w2] = bary;
    uv0 * w0 + uv1 * w1 + uv2 * w2
}
