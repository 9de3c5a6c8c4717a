//! Nearest-hit traversal
//!
//! Iterative depth-first walk with a fixed array stack. Children are pushed
//! far-first so the child on the near side of the split plane is examined
//! first, and subtrees whose box starts beyond the best hit so far are
//! skipped. Every query is independent, so batches can run in parallel.

use tina_math::{ray_aabb, ray_triangle, Ray, Vec3};

use crate::bvh::Bvh;
use crate::node::{left_child, right_child, NodeTag, ROOT};
use crate::stack::TraversalStack;

/// Read access to triangle vertex positions by primitive id
pub trait TriangleSource {
    /// Positions of triangle `index`, or None if there is no such triangle
    fn triangle_positions(&self, index: u32) -> Option<[Vec3; 3]>;
}

impl TriangleSource for [[Vec3; 3]] {
    fn triangle_positions(&self, index: u32) -> Option<[Vec3; 3]> {
        self.get(index as usize).copied()
    }
}

impl<T: TriangleSource + ?Sized> TriangleSource for &T {
    fn triangle_positions(&self, index: u32) -> Option<[Vec3; 3]> {
        (**self).triangle_positions(index)
    }
}

/// Result of a nearest-hit query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub found: bool,
    /// Distance along the ray, infinite on a miss
    pub distance: f32,
    /// Primitive id of the hit triangle, `u32::MAX` on a miss
    pub triangle: u32,
    /// Parametric coordinates on the triangle
    pub uv: [f32; 2],
}

impl Hit {
    pub const MISS: Self = Self {
        found: false,
        distance: f32::INFINITY,
        triangle: u32::MAX,
        uv: [0.0, 0.0],
    };

    #[inline]
    pub fn is_hit(&self) -> bool {
        self.found
    }

    /// Barycentric weights `[w, u, v]` of the hit
    #[inline]
    pub fn barycentric(&self) -> [f32; 3] {
        let [u, v] = self.uv;
        [1.0 - u - v, u, v]
    }

    /// World position of the hit
    pub fn point(&self, ray: &Ray) -> Option<Vec3> {
        self.found.then(|| ray.at(self.distance))
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::MISS
    }
}

impl Bvh {
    /// Nearest triangle along `ray`, skipping `exclude`
    pub fn intersect<S>(&self, ray: &Ray, source: &S, exclude: Option<u32>) -> Hit
    where
        S: TriangleSource + ?Sized,
    {
        self.intersect_with(ray, source, exclude, false)
    }

    /// Nearest triangle along `ray`, optionally ignoring back faces
    pub fn intersect_with<S>(
        &self,
        ray: &Ray,
        source: &S,
        exclude: Option<u32>,
        cull_backfaces: bool,
    ) -> Hit
    where
        S: TriangleSource + ?Sized,
    {
        let mut best = Hit::MISS;
        if self.is_empty() {
            return best;
        }

        let capacity = self.capacity();
        let mut stack = TraversalStack::new();
        stack.push(ROOT);
        let mut visits = 0usize;

        while let Some(id) = stack.pop() {
            if visits >= capacity {
                log::warn!(
                    "BVH traversal stopped after {} node visits; tree is malformed",
                    visits
                );
                break;
            }
            visits += 1;

            let node = &self.nodes[id as usize];
            match node.tag {
                NodeTag::Empty => {}
                NodeTag::Leaf => {
                    if exclude == Some(node.primitive) {
                        continue;
                    }
                    let Some([v0, v1, v2]) = source.triangle_positions(node.primitive) else {
                        continue;
                    };
                    if let Some(hit) = ray_triangle(ray, v0, v1, v2, cull_backfaces) {
                        if hit.distance < best.distance {
                            best = Hit {
                                found: true,
                                distance: hit.distance,
                                triangle: node.primitive,
                                uv: hit.uv(),
                            };
                        }
                    }
                }
                NodeTag::Split(axis) => {
                    let Some((entry, _)) = ray_aabb(ray, &node.bounds) else {
                        continue;
                    };
                    if entry > best.distance {
                        continue;
                    }

                    let (left, right) = (left_child(id), right_child(id));
                    if right as usize >= capacity {
                        continue;
                    }

                    let (near, far) = if ray.direction.axis(axis as usize) < 0.0 {
                        (right, left)
                    } else {
                        (left, right)
                    };
                    if !(stack.push(far) && stack.push(near)) {
                        log::warn!("BVH traversal stack overflow at node {}", id);
                        break;
                    }
                }
            }
        }

        best
    }

    /// Run one query per `(ray, exclude)` pair
    ///
    /// With the `parallel` feature the queries are spread over the rayon
    /// thread pool; results are in input order either way.
    pub fn intersect_many<S>(
        &self,
        queries: &[(Ray, Option<u32>)],
        source: &S,
        cull_backfaces: bool,
    ) -> Vec<Hit>
    where
        S: TriangleSource + Sync + ?Sized,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            queries
                .par_iter()
                .map(|(ray, exclude)| self.intersect_with(ray, source, *exclude, cull_backfaces))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            queries
                .iter()
                .map(|(ray, exclude)| self.intersect_with(ray, source, *exclude, cull_backfaces))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BvhNode, PackedNode};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tina_math::AABB;

    /// Unit right triangle in the plane z = `z`, shifted by `x`
    fn tri_at(x: f32, z: f32) -> [Vec3; 3] {
        [
            Vec3::new(x, 0.0, z),
            Vec3::new(x + 1.0, 0.0, z),
            Vec3::new(x, 1.0, z),
        ]
    }

    fn bounds_of(tris: &[[Vec3; 3]]) -> Vec<AABB> {
        tris.iter().map(|t| AABB::from_points(t)).collect()
    }

    fn build(tris: &[[Vec3; 3]], capacity: usize) -> Bvh {
        let mut bvh = Bvh::new(capacity).unwrap();
        bvh.build(&bounds_of(tris)).unwrap();
        bvh
    }

    fn brute_force(ray: &Ray, tris: &[[Vec3; 3]], exclude: Option<u32>) -> Hit {
        let mut best = Hit::MISS;
        for (i, [v0, v1, v2]) in tris.iter().enumerate() {
            if exclude == Some(i as u32) {
                continue;
            }
            if let Some(hit) = ray_triangle(ray, *v0, *v1, *v2, false) {
                if hit.distance < best.distance {
                    best = Hit {
                        found: true,
                        distance: hit.distance,
                        triangle: i as u32,
                        uv: hit.uv(),
                    };
                }
            }
        }
        best
    }

    #[test]
    fn test_single_triangle_hit() {
        let tris = vec![tri_at(0.0, 0.0)];
        let bvh = build(&tris, 2);

        let ray = Ray::new(Vec3::new(0.25, 0.25, -1.0), Vec3::Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), None);
        assert!(hit.is_hit());
        assert_eq!(hit.triangle, 0);
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-5);
        assert_relative_eq!(hit.uv[0], 0.25, epsilon = 1e-5);
        assert_relative_eq!(hit.uv[1], 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_single_triangle_miss() {
        let tris = vec![tri_at(0.0, 0.0)];
        let bvh = build(&tris, 2);

        let ray = Ray::new(Vec3::new(5.0, 5.0, -1.0), Vec3::Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), None);
        assert_eq!(hit, Hit::MISS);
        assert!(hit.point(&ray).is_none());
    }

    #[test]
    fn test_small_scale_triangles_hit() {
        let small = |x: f32| {
            [
                Vec3::new(x, 0.0, 1.0),
                Vec3::new(x + 1e-4, 0.0, 1.0),
                Vec3::new(x, 1e-4, 1.0),
            ]
        };
        let one = vec![small(0.0)];
        let ray = Ray::new(Vec3::new(2.5e-5, 2.5e-5, 0.0), Vec3::Z);
        let hit = build(&one, 2).intersect(&ray, one.as_slice(), None);
        assert!(hit.is_hit());
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-5);

        let pair = vec![small(1e-3), small(0.0)];
        let hit = build(&pair, 4).intersect(&ray, pair.as_slice(), None);
        assert!(hit.is_hit());
        assert_eq!(hit.triangle, 1);
    }

    #[test]
    fn test_empty_tree_misses() {
        let bvh = Bvh::new(8).unwrap();
        let tris: Vec<[Vec3; 3]> = Vec::new();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(!bvh.intersect(&ray, tris.as_slice(), None).found);
    }

    #[test]
    fn test_nearest_of_stacked_triangles() {
        let tris = vec![tri_at(0.0, 5.0), tri_at(0.0, 2.0), tri_at(0.0, 8.0)];
        let bvh = build(&tris, 8);

        let ray = Ray::new(Vec3::new(0.2, 0.2, 0.0), Vec3::Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), None);
        assert_eq!(hit.triangle, 1);
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-5);

        // Reversed ray from the far side
        let ray = Ray::new(Vec3::new(0.2, 0.2, 10.0), Vec3::NEG_Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), None);
        assert_eq!(hit.triangle, 2);
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_exclude_self() {
        let tris = vec![tri_at(0.0, 0.0), tri_at(0.0, 3.0)];
        let bvh = build(&tris, 4);

        // Secondary ray leaving the surface of triangle 0
        let ray = Ray::new(Vec3::new(0.2, 0.2, 0.0), Vec3::Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), Some(0));
        assert_eq!(hit.triangle, 1);
        assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-5);

        let only = vec![tri_at(0.0, 0.0)];
        let bvh = build(&only, 2);
        let ray = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::Z);
        assert!(!bvh.intersect(&ray, only.as_slice(), Some(0)).found);
    }

    #[test]
    fn test_backface_culling() {
        let tris = vec![tri_at(0.0, 0.0)];
        let bvh = build(&tris, 2);

        // Counter-clockwise seen from +z, so a ray travelling -z hits the front
        let front = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z);
        let back = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::Z);

        assert!(bvh.intersect_with(&front, tris.as_slice(), None, true).found);
        assert!(!bvh.intersect_with(&back, tris.as_slice(), None, true).found);
        assert!(bvh.intersect_with(&back, tris.as_slice(), None, false).found);
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(1234);
        let tris: Vec<[Vec3; 3]> = (0..200)
            .map(|_| {
                let base = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                let mut corner = || {
                    base + Vec3::new(
                        rng.gen_range(-1.5..1.5),
                        rng.gen_range(-1.5..1.5),
                        rng.gen_range(-1.5..1.5),
                    )
                };
                [corner(), corner(), corner()]
            })
            .collect();
        let bvh = build(&tris, 512);

        for _ in 0..500 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let direction = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if direction.length() < 1e-3 {
                continue;
            }
            let ray = Ray::new(origin, direction);
            let exclude = rng.gen_bool(0.2).then(|| rng.gen_range(0..200));

            let expected = brute_force(&ray, &tris, exclude);
            let actual = bvh.intersect(&ray, tris.as_slice(), exclude);

            assert_eq!(actual.found, expected.found);
            if expected.found {
                assert_relative_eq!(actual.distance, expected.distance, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_intersect_many_preserves_order() {
        let tris = vec![tri_at(0.0, 1.0), tri_at(3.0, 2.0), tri_at(6.0, 3.0)];
        let bvh = build(&tris, 8);

        let queries: Vec<(Ray, Option<u32>)> = (0..3)
            .map(|i| (Ray::new(Vec3::new(i as f32 * 3.0 + 0.2, 0.2, 0.0), Vec3::Z), None))
            .collect();
        let hits = bvh.intersect_many(&queries, tris.as_slice(), false);

        let ids: Vec<u32> = hits.iter().map(|h| h.triangle).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_source_triangle_is_skipped() {
        let tris = vec![tri_at(0.0, 0.0), tri_at(0.0, 2.0)];
        let bvh = build(&tris, 4);

        // Source only knows the first triangle
        let partial = vec![tri_at(0.0, 0.0)];
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        let hit = bvh.intersect(&ray, partial.as_slice(), None);
        assert_eq!(hit.triangle, 0);
    }

    #[test]
    fn test_out_of_range_children_are_skipped() {
        // A split at the last level whose children would fall off the array
        let bounds = AABB::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut packed = vec![PackedNode::default(); 4];
        packed[1] = PackedNode::from(&BvhNode::split(0, bounds));
        packed[2] = PackedNode::from(&BvhNode::split(0, bounds));
        packed[3] = PackedNode::from(&BvhNode::leaf(0, bounds));
        let bvh = Bvh::from_packed(&packed).unwrap();

        let tris = vec![[
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]];
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let hit = bvh.intersect(&ray, tris.as_slice(), None);
        assert!(hit.found);
        assert_eq!(hit.triangle, 0);
    }

    #[test]
    fn test_hit_barycentric() {
        let hit = Hit {
            found: true,
            distance: 1.0,
            triangle: 0,
            uv: [0.25, 0.5],
        };
        assert_eq!(hit.barycentric(), [0.25, 0.25, 0.5]);
    }
}
