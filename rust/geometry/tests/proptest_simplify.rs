// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for point merging and simplification.
//!
//! Run with: cargo test -p ifc-mend-geometry -- proptest

use ifc_mend_geometry::{simplify_mesh_set, MeshSimplifier, PointMergeCache, PolyInputCache3D};
use ifc_mend_topology::{check_mesh_set_valid_and_closed, GeomProcessingParams, MeshSet};
use nalgebra::Point3;
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_point() -> impl Strategy<Value = Point3<f64>> {
    prop::array::uniform3(-10.0..10.0f64).prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Random triangle soup; indices may repeat within a triangle.
fn arb_soup(max_points: usize, max_faces: usize) -> impl Strategy<Value = MeshSet> {
    (3..=max_points).prop_flat_map(move |n| {
        let points = prop::collection::vec(arb_point(), n);
        let faces = prop::collection::vec(prop::array::uniform3(0..n), 1..=max_faces);
        (points, faces).prop_map(|(points, faces)| {
            MeshSet::from_polygons(&points, &faces).expect("indices are in range")
        })
    })
}

/// Axis-aligned box split into triangles, optionally with one face left out.
fn arb_box() -> impl Strategy<Value = MeshSet> {
    (
        prop::array::uniform3(0.1..5.0f64),
        prop::option::of(0usize..12),
    )
        .prop_map(|([sx, sy, sz], missing)| {
            let points: Vec<Point3<f64>> = (0..8)
                .map(|i| {
                    Point3::new(
                        if i & 1 != 0 { sx } else { 0.0 },
                        if i & 2 != 0 { sy } else { 0.0 },
                        if i & 4 != 0 { sz } else { 0.0 },
                    )
                })
                .collect();
            let triangles = [
                [0usize, 2, 3],
                [0, 3, 1],
                [4, 5, 7],
                [4, 7, 6],
                [0, 1, 5],
                [0, 5, 4],
                [1, 3, 7],
                [1, 7, 5],
                [3, 2, 6],
                [3, 6, 7],
                [2, 0, 4],
                [2, 4, 6],
            ];
            let kept: Vec<[usize; 3]> = triangles
                .iter()
                .enumerate()
                .filter(|(i, _)| Some(*i) != missing)
                .map(|(_, t)| *t)
                .collect();
            MeshSet::from_polygons(&points, &kept).expect("indices are in range")
        })
}

// =============================================================================
// Point cache
// =============================================================================

proptest! {
    #[test]
    fn point_cache_round_trip(
        p in arb_point(),
        jitter in prop::array::uniform3(-0.9e-6..0.9e-6f64),
    ) {
        let mut cache = PointMergeCache::new(1e-6);
        let first = cache.add_point(p);
        prop_assert_eq!(cache.add_point(p), first);
        let near = Point3::new(p.x + jitter[0], p.y + jitter[1], p.z + jitter[2]);
        prop_assert_eq!(cache.add_point(near), first);
    }

    #[test]
    fn point_cache_separates_far_points(
        p in arb_point(),
        axis in 0usize..3,
        offset in 2e-6..1.0f64,
    ) {
        let mut cache = PointMergeCache::new(1e-6);
        let first = cache.add_point(p);
        let mut far = p;
        far[axis] += offset;
        prop_assert_ne!(cache.add_point(far), first);
        prop_assert_eq!(cache.len(), 2);
    }

    #[test]
    fn face_check_never_stores_degenerate_triangles(
        points in prop::collection::vec(arb_point(), 3..8),
        faces in prop::collection::vec(prop::array::uniform3(0usize..8), 1..10),
        eps in 1e-6..0.5f64,
    ) {
        let mut cache = PolyInputCache3D::new(eps);
        let ids: Vec<usize> = points.iter().map(|&p| cache.add_point(p)).collect();
        for [a, b, c] in faces {
            let tri = [ids[a % ids.len()], ids[b % ids.len()], ids[c % ids.len()]];
            cache.add_face_check_indexes(&tri);
        }

        if let Ok(mesh) = cache.build_mesh_set() {
            for fk in mesh.face_keys() {
                let pts = mesh.face_points(fk);
                prop_assert_eq!(pts.len(), 3);
                for i in 0..3 {
                    let len2 = (pts[(i + 1) % 3] - pts[i]).norm_squared();
                    prop_assert!(len2 > eps * eps * 10.0);
                }
            }
        }
    }
}

// =============================================================================
// Simplification
// =============================================================================

proptest! {
    #[test]
    fn simplify_never_returns_worse(mesh in arb_soup(10, 16)) {
        let params = GeomProcessingParams::default();
        let input = check_mesh_set_valid_and_closed(&mesh, &params);

        if let Ok(result) = MeshSimplifier::new(params.clone()).simplify(&mesh) {
            prop_assert!(result.info.is_better_for_bool_op(&input));
            prop_assert!(result.mesh.check_pointers(params.max_num_face_edges).is_ok());
        }

        let mut in_place = mesh.clone();
        let after = simplify_mesh_set(&mut in_place, &params);
        prop_assert!(after.is_not_worse_for_bool_op(&input));
    }

    #[test]
    fn boxes_simplify_to_quads(mesh in arb_box()) {
        let params = GeomProcessingParams::default();
        let input = check_mesh_set_valid_and_closed(&mesh, &params);
        let volume = mesh.volume();

        let mut mesh = mesh;
        let info = simplify_mesh_set(&mut mesh, &params);
        prop_assert!(info.is_not_worse_for_bool_op(&input));
        prop_assert_eq!(info.num_open_edges(), input.num_open_edges());
        if input.is_closed() {
            prop_assert_eq!(mesh.face_count(), 6);
            prop_assert!((mesh.volume() - volume).abs() < 1e-9);
        }
    }
}
