//! Integration tests for render sessions
//!
//! Exercises the whole stack from loading through traversal:
//! - Nearest-hit and self-exclusion across objects
//! - Rebuild after deletes with holes in the triangle index space
//! - Capacity failures leaving the session usable
//! - Concurrent queries sharing one read phase

use std::sync::Arc;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tina_accel::{Bvh, Hit};
use tina_geometry::{GeometryError, VertexRecord};
use tina_math::{ray_triangle, Ray, Vec2, Vec3};
use tina_memory::MemoryError;
use tina_session::{RenderSession, SessionConfig, SessionError};

/// Quad in the plane z = `z` covering [x, x+1] x [0, 1], as two triangles
fn quad(x: f32, z: f32) -> Vec<VertexRecord> {
    let v = |px: f32, py: f32| {
        VertexRecord::new(Vec3::new(px, py, z), Vec3::NEG_Z, Vec2::new(px - x, py))
    };
    vec![
        v(x, 0.0),
        v(x + 1.0, 0.0),
        v(x + 1.0, 1.0),
        v(x, 0.0),
        v(x + 1.0, 1.0),
        v(x, 1.0),
    ]
}

fn session() -> RenderSession {
    RenderSession::new(SessionConfig::small()).expect("small config is valid")
}

#[test]
fn test_nearest_hit_across_objects() {
    let session = session();
    let far = session.load(&quad(0.0, 8.0)).unwrap();
    let near = session.load(&quad(0.0, 3.0)).unwrap();
    session.rebuild().unwrap();

    let ray = Ray::new(Vec3::new(0.3, 0.6, 0.0), Vec3::Z);
    let hit = session.intersect(&ray, None).unwrap();

    assert!(hit.found);
    assert_relative_eq!(hit.distance, 3.0, epsilon = 1e-5);

    let view = session.view().unwrap();
    let near_range = view.pool().triangle_range(near).unwrap();
    let far_range = view.pool().triangle_range(far).unwrap();
    assert!(near_range.contains(&hit.triangle));
    assert!(!far_range.contains(&hit.triangle));
}

#[test]
fn test_self_exclusion_for_secondary_rays() {
    let session = session();
    session.load(&quad(0.0, 0.0)).unwrap();
    session.load(&quad(0.0, 4.0)).unwrap();
    session.rebuild().unwrap();

    let primary = Ray::new(Vec3::new(0.7, 0.2, -1.0), Vec3::Z);
    let first = session.intersect(&primary, None).unwrap();
    assert!(first.found);
    assert_relative_eq!(first.distance, 1.0, epsilon = 1e-5);

    // Bounce straight on from the hit point, which lies on the first surface
    let origin = first.point(&primary).unwrap();
    let secondary = Ray::new(origin, Vec3::Z);
    let second = session.intersect(&secondary, Some(first.triangle)).unwrap();

    assert!(second.found);
    assert_ne!(second.triangle, first.triangle);
    assert_relative_eq!(second.distance, 4.0, epsilon = 1e-4);
}

#[test]
fn test_export_and_triangle_at_are_bit_identical() {
    let session = session();
    let records = quad(2.5, -1.25);
    let handle = session.load(&records).unwrap();
    session.rebuild().unwrap();

    assert_eq!(session.export(handle).unwrap(), records);

    let view = session.view().unwrap();
    for (k, index) in view.pool().triangle_range(handle).unwrap().enumerate() {
        let tri = view.triangle_at(index).unwrap();
        assert_eq!(tri.vertices, [records[3 * k], records[3 * k + 1], records[3 * k + 2]]);
    }
}

#[test]
fn test_rebuild_after_delete_skips_holes() {
    let session = session();
    let a = session.load(&quad(0.0, 1.0)).unwrap();
    let b = session.load(&quad(0.0, 2.0)).unwrap();
    session.rebuild().unwrap();

    let ray = Ray::new(Vec3::new(0.5, 0.25, 0.0), Vec3::Z);
    let before = session.intersect(&ray, None).unwrap();
    assert_relative_eq!(before.distance, 1.0, epsilon = 1e-5);

    session.delete(a).unwrap();
    assert!(matches!(session.intersect(&ray, None), Err(SessionError::HierarchyStale)));

    let stats = session.rebuild().unwrap();
    assert_eq!(stats.primitives, 2);
    assert_eq!(stats.leaves, 2);

    let after = session.intersect(&ray, None).unwrap();
    assert_relative_eq!(after.distance, 2.0, epsilon = 1e-5);

    // The surviving object keeps its triangle indices
    let view = session.view().unwrap();
    assert_eq!(view.pool().triangle_range(b).unwrap(), 2..4);
    assert!(view.pool().triangle_range(b).unwrap().contains(&after.triangle));
}

#[test]
fn test_stale_handle_after_slot_reuse() {
    let session = session();
    let a = session.load(&quad(0.0, 1.0)).unwrap();
    session.delete(a).unwrap();
    let b = session.load(&quad(0.0, 1.0)).unwrap();

    assert_eq!(a.slot(), b.slot());
    assert!(matches!(
        session.delete(a),
        Err(SessionError::Geometry(GeometryError::StaleHandle(h))) if h == a
    ));
    assert!(session.export(b).is_ok());
}

#[test]
fn test_out_of_space_leaves_session_usable() {
    let config = SessionConfig::small().with_vertex_capacity(12);
    let session = RenderSession::new(config).unwrap();
    session.load(&quad(0.0, 1.0)).unwrap();

    let mut big = quad(0.0, 2.0);
    big.extend(quad(1.0, 2.0));
    let err = session.load(&big).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Geometry(GeometryError::Memory(MemoryError::OutOfSpace {
            requested: 12,
            largest_free: 6,
            capacity: 12,
        }))
    ));

    let stats = session.stats();
    assert_eq!(stats.objects, 1);
    assert_eq!(stats.vertices, 6);
    assert_eq!(stats.slots.live, 1);

    session.load(&quad(3.0, 1.0)).unwrap();
    session.rebuild().unwrap();
    assert_eq!(session.stats().triangles, 4);
}

#[test]
fn test_out_of_slots() {
    let config = SessionConfig::small().with_object_capacity(2);
    let session = RenderSession::new(config).unwrap();
    session.load(&quad(0.0, 1.0)).unwrap();
    session.load(&quad(1.0, 1.0)).unwrap();

    assert!(matches!(
        session.load(&quad(2.0, 1.0)),
        Err(SessionError::Geometry(GeometryError::Memory(MemoryError::OutOfSlots { capacity: 2 })))
    ));
    assert_eq!(session.stats().vertices, 12);
}

#[test]
fn test_reserve_import_then_query() {
    let session = session();
    let handle = session.reserve(6).unwrap();
    session.import(handle, &quad(0.0, 5.0)).unwrap();
    session.rebuild().unwrap();

    let ray = Ray::new(Vec3::new(0.4, 0.7, 0.0), Vec3::Z);
    let hit = session.intersect(&ray, None).unwrap();
    assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-5);
}

#[test]
fn test_load_floats() {
    let session = session();
    let records = quad(0.0, 1.0);
    let floats: Vec<f32> = records
        .iter()
        .flat_map(|r| r.position.into_iter().chain(r.normal).chain(r.texcoord))
        .collect();

    let handle = session.load_floats(&floats).unwrap();
    assert_eq!(session.export(handle).unwrap(), records);
    session.with_floats(|all| assert_eq!(&all[..floats.len()], floats.as_slice()));
}

#[test]
fn test_backface_culling_config() {
    let config = SessionConfig::small().with_cull_backfaces(true);
    let session = RenderSession::new(config).unwrap();
    session.load(&quad(0.0, 2.0)).unwrap();
    session.rebuild().unwrap();

    // Quad winds counter-clockwise seen from +z
    let toward_back = Ray::new(Vec3::new(0.4, 0.7, 0.0), Vec3::Z);
    let toward_front = Ray::new(Vec3::new(0.4, 0.7, 4.0), Vec3::NEG_Z);
    assert!(!session.intersect(&toward_back, None).unwrap().found);
    assert!(session.intersect(&toward_front, None).unwrap().found);
}

#[test]
fn test_random_scene_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(99);
    let session = RenderSession::new(SessionConfig::small()).unwrap();

    let mut handles = Vec::new();
    for _ in 0..12 {
        let records: Vec<VertexRecord> = (0..3 * rng.gen_range(1..20))
            .map(|_| {
                let p = Vec3::new(
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                    rng.gen_range(-8.0..8.0),
                );
                VertexRecord::new(p, Vec3::Y, Vec2::ZERO)
            })
            .collect();
        handles.push(session.load(&records).unwrap());
    }
    for handle in handles.iter().step_by(3) {
        session.delete(*handle).unwrap();
    }
    session.rebuild().unwrap();

    let view = session.view().unwrap();
    let live: Vec<u32> = view.pool().live_triangle_indices().collect();
    let queries: Vec<(Ray, Option<u32>)> = (0..300)
        .map(|_| {
            let origin = Vec3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            let target = Vec3::new(
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
            );
            (Ray::from_points(origin, target), None)
        })
        .collect();

    let hits = view.intersect_many(&queries);
    for ((ray, _), hit) in queries.iter().zip(&hits) {
        let mut expected = Hit::MISS;
        for &index in &live {
            let [v0, v1, v2] = view.triangle_at(index).unwrap().positions();
            if let Some(h) = ray_triangle(ray, v0, v1, v2, false) {
                if h.distance < expected.distance {
                    expected.found = true;
                    expected.distance = h.distance;
                    expected.triangle = index;
                }
            }
        }

        assert_eq!(hit.found, expected.found);
        if expected.found {
            assert_relative_eq!(hit.distance, expected.distance, epsilon = 1e-4);
            assert!(live.contains(&hit.triangle));
        }
    }
}

#[test]
fn test_concurrent_queries() {
    let session = Arc::new(session());
    for i in 0..8 {
        session.load(&quad(i as f32 * 2.0, 1.0 + i as f32)).unwrap();
    }
    session.rebuild().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                let view = session.view().expect("hierarchy is current");
                (0..8)
                    .map(|i| {
                        let x = i as f32 * 2.0 + 0.25 + t as f32 * 0.1;
                        let ray = Ray::new(Vec3::new(x, 0.5, 0.0), Vec3::Z);
                        view.intersect(&ray, None).distance
                    })
                    .collect::<Vec<f32>>()
            })
        })
        .collect();

    for handle in handles {
        let distances = handle.join().expect("query thread panicked");
        for (i, d) in distances.into_iter().enumerate() {
            assert_relative_eq!(d, 1.0 + i as f32, epsilon = 1e-5);
        }
    }
}

#[test]
fn test_packed_upload_matches_live_tree() {
    let session = session();
    for i in 0..5 {
        session.load(&quad(i as f32, i as f32 + 1.0)).unwrap();
    }
    session.rebuild().unwrap();

    let packed = session.packed_nodes();
    assert_eq!(packed.len(), session.config().tree_capacity);

    let restored = Bvh::from_packed(&packed).unwrap();
    let view = session.view().unwrap();
    let ray = Ray::new(Vec3::new(2.5, 0.3, -1.0), Vec3::Z);
    assert_eq!(restored.intersect(&ray, view.pool(), None), view.intersect(&ray, None));
}

#[test]
fn test_stats_track_versions() {
    let session = session();
    assert_eq!(session.stats().hierarchy_version, 0);

    session.load(&quad(0.0, 1.0)).unwrap();
    session.rebuild().unwrap();
    let stats = session.stats();
    assert_eq!(stats.hierarchy_version, 1);
    assert_eq!(stats.hierarchy.leaves, 2);
    assert_eq!(stats.hierarchy.splits, 1);
    assert!(!stats.stale);
}
