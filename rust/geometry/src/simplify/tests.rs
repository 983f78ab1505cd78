// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use ifc_mend_topology::test_meshes::{
    cube_with_midpoint, hollow_box, split_quad, tetra_with_split_apex, triangulated_cube, unit_cube,
};
use ifc_mend_topology::{check_mesh_set_valid_and_closed, Diagnostic, GeomProcessingParams, MeshSet};
use nalgebra::Point3;

use super::*;

// =============================================================================
// Fixtures
// =============================================================================

/// Closed prism with a shallow ridge of height `h` along x. Volume is `h / 2`.
fn tent(h: f64) -> MeshSet {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.5, h),
        Point3::new(1.0, 0.5, h),
    ];
    let faces: Vec<Vec<usize>> = vec![
        vec![0, 3, 2, 1],
        vec![0, 1, 5, 4],
        vec![4, 5, 2, 3],
        vec![0, 4, 3],
        vec![1, 2, 5],
    ];
    MeshSet::from_polygons(&points, &faces).unwrap()
}

fn recording_params() -> (GeomProcessingParams, Arc<Mutex<Vec<Diagnostic>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let params = GeomProcessingParams::default()
        .with_debug_callback(move |d: &Diagnostic| sink.lock().unwrap().push(d.clone()));
    (params, log)
}

// =============================================================================
// Stages
// =============================================================================

#[test]
fn split_quad_merges_into_single_face() {
    let params = GeomProcessingParams::default();
    let mut mesh = split_quad();
    let before = check_mesh_set_valid_and_closed(&mesh, &params);
    let boundary = mesh.open_boundary_length();

    let changes = merge_coplanar_faces_in_mesh_set(&mut mesh, &params, false).unwrap();
    assert!(changes >= 1);
    assert_eq!(mesh.face_count(), 1);
    let face = mesh.face_keys().next().unwrap();
    assert_eq!(mesh.face(face).unwrap().n_edges, 4);

    let after = check_mesh_set_valid_and_closed(&mesh, &params);
    assert!(after.all_pointers_valid);
    assert_eq!(after.num_closed_edges, 0);
    assert_eq!(after.num_open_edges(), before.num_open_edges());
    assert_relative_eq!(mesh.open_boundary_length(), boundary, epsilon = 1e-12);
}

#[test]
fn triangulated_cube_merges_back_to_quads() {
    let params = GeomProcessingParams::default();
    let mut mesh = triangulated_cube();

    assert_eq!(merge_coplanar_faces_in_mesh_set(&mut mesh, &params, true).unwrap(), 6);
    assert_eq!(mesh.face_count(), 6);
    assert!(check_mesh_set_valid_and_closed(&mesh, &params).mesh_set_valid);
    assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-12);
}

#[test]
fn merge_losing_volume_is_rolled_back() {
    let h = 0.01;
    let (params, log) = recording_params();
    let params = params
        .with_eps_merge_points(0.05)
        .with_eps_merge_aligned_edges_angle(0.01);

    let mut closed = tent(h);
    assert_relative_eq!(closed.volume(), h / 2.0, epsilon = 1e-12);
    assert_eq!(merge_coplanar_faces_in_mesh_set(&mut closed, &params, true).unwrap(), 0);
    assert_eq!(closed.face_count(), 5);
    assert_relative_eq!(closed.volume(), h / 2.0, epsilon = 1e-12);
    assert!(log
        .lock()
        .unwrap()
        .iter()
        .any(|d| matches!(d, Diagnostic::StageRejected { .. })));

    // Without the closed-mesh guard the same merge goes through
    let mut open = tent(h);
    assert_eq!(merge_coplanar_faces_in_mesh_set(&mut open, &params, false).unwrap(), 1);
    assert_eq!(open.face_count(), 4);
}

#[test]
fn degenerate_faces_are_removed() {
    let params = GeomProcessingParams::default();
    let mesh = tetra_with_split_apex();
    let before = check_mesh_set_valid_and_closed(&mesh, &params);
    assert_eq!(before.degenerate_edges.len(), 2);
    assert_eq!(before.zero_area_faces.len(), 2);

    let (rebuilt, removed) = remove_degenerate_faces_in_mesh_set(&mesh, &params).unwrap();
    assert_eq!(removed, 2);

    let after = check_mesh_set_valid_and_closed(&rebuilt, &params);
    assert!(after.degenerate_edges.is_empty());
    assert!(after.num_faces <= before.num_faces - before.zero_area_faces.len());
    assert!(after.mesh_set_valid, "{}", after.details);
    assert_eq!(rebuilt.vertex_count(), 4);
}

#[test]
fn aligned_edges_reach_fixed_point() {
    let params = GeomProcessingParams::default();
    let mut mesh = cube_with_midpoint();

    assert_eq!(merge_aligned_edges_in_mesh_set(&mut mesh, &params), 2);
    assert_eq!(merge_aligned_edges_in_mesh_set(&mut mesh, &params), 0);
    assert_eq!(mesh.vertex_count(), 8);
    assert!(check_mesh_set_valid_and_closed(&mesh, &params).mesh_set_valid);
}

// =============================================================================
// Simplifier
// =============================================================================

#[test]
fn triangulated_cube_is_simplified() {
    let simplifier = MeshSimplifier::default();
    let result = simplifier.simplify(&triangulated_cube()).unwrap();

    assert_eq!(result.mesh.face_count(), 6);
    assert!(result.info.mesh_set_valid);
    assert_eq!(result.stages, vec![Stage::MergeCoplanar]);
    assert_relative_eq!(result.mesh.volume(), 1.0, epsilon = 1e-12);
}

#[test]
fn clean_cube_reports_no_improvement() {
    let (params, log) = recording_params();
    let simplifier = MeshSimplifier::new(params);

    assert_eq!(
        simplifier.simplify(&unit_cube()).unwrap_err(),
        SimplifyOutcome::NoImprovement
    );
    assert!(log
        .lock()
        .unwrap()
        .iter()
        .any(|d| matches!(d, Diagnostic::NoImprovement { .. })));
}

#[test]
fn split_apex_is_repaired() {
    let simplifier = MeshSimplifier::default();
    let result = simplifier.simplify(&tetra_with_split_apex()).unwrap();

    assert_eq!(result.stages.first(), Some(&Stage::RemoveDegenerate));
    assert!(result.info.mesh_set_valid);
    assert_eq!(result.info.num_degenerate(), 0);
    assert_eq!(result.mesh.face_count(), 4);
}

#[test]
fn midpoint_vertex_is_removed() {
    let result = MeshSimplifier::default()
        .simplify(&cube_with_midpoint())
        .unwrap();

    assert!(result.stages.contains(&Stage::MergeAligned));
    assert_eq!(result.info.num_vertices, 8);
    assert_eq!(result.info.num_edges, 24);
}

#[test]
fn open_mesh_rejects_worse_retriangulation() {
    let (params, log) = recording_params();
    let result = MeshSimplifier::new(params).simplify(&split_quad()).unwrap();

    assert_eq!(result.stages, vec![Stage::MergeCoplanar]);
    assert_eq!(result.mesh.face_count(), 1);
    assert!(!result.info.mesh_set_valid);
    assert!(log.lock().unwrap().iter().any(|d| matches!(
        d,
        Diagnostic::StageRejected {
            stage: "retriangulate",
            ..
        }
    )));
}

#[test]
fn face_edge_overflow_is_a_structural_defect() {
    let params = GeomProcessingParams::default().with_max_num_face_edges(3);
    let outcome = MeshSimplifier::new(params)
        .simplify(&triangulated_cube())
        .unwrap_err();
    assert!(matches!(outcome, SimplifyOutcome::StructuralDefect(_)));
}

#[test]
fn result_can_be_triangulated() {
    let params = GeomProcessingParams::default().with_triangulate_result(true);
    let result = MeshSimplifier::new(params)
        .simplify(&cube_with_midpoint())
        .unwrap();

    assert_eq!(result.stages.last(), Some(&Stage::Triangulate));
    assert_eq!(result.mesh.face_count(), 12);
    assert!(result.info.mesh_set_valid);
    assert_relative_eq!(result.mesh.volume(), 1.0, epsilon = 1e-12);
}

#[test]
fn inward_cube_is_returned_outward() {
    let mut mesh = triangulated_cube();
    mesh.invert_shell(0);
    assert!(mesh.volume() < 0.0);

    let info = simplify_mesh_set(&mut mesh, &GeomProcessingParams::default());
    assert!(info.mesh_set_valid);
    assert_eq!(mesh.face_count(), 6);
    assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-12);
}

#[test]
fn simplify_in_place_keeps_input_without_improvement() {
    let mut mesh = unit_cube();
    let info = simplify_mesh_set(&mut mesh, &GeomProcessingParams::default());
    assert!(info.mesh_set_valid);
    assert_eq!(mesh.face_count(), 6);
}

#[test]
fn hollow_solid_keeps_its_cavity() {
    let input = hollow_box(true);
    assert_relative_eq!(input.volume(), 63.0, epsilon = 1e-9);

    let result = MeshSimplifier::default().simplify(&input).unwrap();
    assert_eq!(result.mesh.face_count(), 12);
    assert_eq!(result.mesh.shell_count(), 2);
    assert!(result.info.mesh_set_valid);
    assert_relative_eq!(result.mesh.volume(), 63.0, epsilon = 1e-9);
}

#[test]
fn failed_retriangulation_is_reported_and_skipped() {
    // Edges far below the merge tolerance: the rebuild keeps no triangle
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1e-7, 0.0, 0.0),
        Point3::new(0.0, 1e-7, 0.0),
    ];
    let speck = MeshSet::from_polygons(&points, &[[0usize, 1, 2]]).unwrap();
    let (params, log) = recording_params();

    let outcome = MeshSimplifier::new(params.clone()).simplify(&speck).unwrap_err();
    assert_eq!(outcome, SimplifyOutcome::NoImprovement);
    assert!(log.lock().unwrap().iter().any(|d| matches!(
        d,
        Diagnostic::KernelFailure {
            stage: "retriangulate",
            ..
        }
    )));

    let mut mesh = speck.clone();
    simplify_mesh_set(&mut mesh, &params);
    assert_eq!(mesh.face_count(), 1);
    assert_eq!(mesh.vertex_count(), 3);
}
