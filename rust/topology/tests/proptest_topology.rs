// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for validation and surgery.
//!
//! Run with: cargo test -p ifc-mend-topology -- proptest

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

/// Unit square in the XY plane with extra colinear points on each side.
fn subdivided_square(splits: [usize; 4]) -> MeshSet {
    let corners = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    let mut points = Vec::new();
    for side in 0..4 {
        let (a, b) = (corners[side], corners[(side + 1) % 4]);
        let n = splits[side] + 1;
        for i in 0..n {
            points.push(a + (b - a) * (i as f64 / n as f64));
        }
    }
    let polygon: Vec<usize> = (0..points.len()).collect();
    MeshSet::from_polygons(&points, &[polygon]).expect("valid polygon")
}

// =============================================================================
// Validation
// =============================================================================

proptest! {
    #[test]
    fn validation_is_idempotent(mesh in arb_soup(12, 20)) {
        let params = GeomProcessingParams::default();
        let first = check_mesh_set_valid_and_closed(&mesh, &params);
        let second = check_mesh_set_valid_and_closed(&mesh, &params);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn constructed_meshes_have_consistent_pointers(mesh in arb_soup(12, 20)) {
        prop_assert!(mesh.check_pointers(10_000).is_ok());
        let info = check_mesh_set_valid_and_closed(&mesh, &GeomProcessingParams::default());
        prop_assert!(info.all_pointers_valid);
        prop_assert_eq!(info.num_edges, mesh.edge_count());
        prop_assert_eq!(info.num_closed_edges + info.open_edges.len(), info.num_edges);
    }
}

// =============================================================================
// Surgery
// =============================================================================

proptest! {
    #[test]
    fn aligned_merge_reaches_fixed_point(splits in prop::array::uniform4(0usize..6)) {
        let params = GeomProcessingParams::default();
        let mut mesh = subdivided_square(splits);
        let original_edges = mesh.edge_count();

        let mut iterations = 0;
        loop {
            let before = mesh.edge_count();
            let removed = mesh.merge_aligned_edges(&params);
            if removed == 0 {
                break;
            }
            iterations += 1;
            prop_assert_eq!(mesh.edge_count(), before - removed);
            prop_assert!(iterations <= original_edges);
        }

        prop_assert_eq!(mesh.edge_count(), 4);
        prop_assert!(mesh.check_pointers(10_000).is_ok());
        let face = mesh.face_keys().next().unwrap();
        prop_assert!((mesh.face_area(face) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn surgery_keeps_pointers_consistent(mesh in arb_soup(10, 16)) {
        let params = GeomProcessingParams::default();
        let mut mesh = mesh;

        while mesh.merge_aligned_edges(&params) > 0 {}
        prop_assert!(mesh.check_pointers(10_000).is_ok());

        let edges: Vec<_> = mesh.edge_keys().collect();
        for ek in edges {
            if mesh.contains_edge(ek) {
                mesh.remove_edge_and_merge_faces(ek, &params).unwrap();
            }
        }
        prop_assert!(mesh.check_pointers(10_000).is_ok());
    }
}
