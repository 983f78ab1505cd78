// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Individual simplification stages.
//!
//! Each stage can be run on its own; [`MeshSimplifier`](super::MeshSimplifier)
//! chains them and decides which results to keep.

use ifc_mend_topology::{Diagnostic, EdgeKey, GeomProcessingParams, MeshSet};

use crate::error::Result;
use crate::point_cache::PolyInputCache3D;

/// Fraction of the pre-merge volume a closed mesh must keep for a coplanar
/// merge to be accepted.
pub const MERGE_VOLUME_RATIO: f64 = 0.9;

/// Rebuilds the mesh without its zero-area faces.
///
/// Surviving faces go through [`PolyInputCache3D`], so coincident vertices
/// joined by zero-length edges are merged as well. Returns the rebuilt mesh
/// and the number of faces dropped.
pub fn remove_degenerate_faces_in_mesh_set(
    mesh: &MeshSet,
    params: &GeomProcessingParams,
) -> Result<(MeshSet, usize)> {
    let eps_sq = params.eps_merge_points_sq();
    let mut cache = PolyInputCache3D::from_params(params);
    let mut removed = 0;

    for fk in mesh.face_keys() {
        if mesh.face_area(fk) < eps_sq {
            removed += 1;
            continue;
        }
        if !cache.add_polygon(&mesh.face_points(fk)) {
            removed += 1;
        }
    }

    let rebuilt = cache.build_mesh_set()?;
    tracing::debug!(
        removed,
        faces = rebuilt.face_count(),
        "removed degenerate faces"
    );
    Ok((rebuilt, removed))
}

/// Merges adjacent faces that lie in the same plane with the same
/// orientation.
///
/// Passes repeat until one makes no change. With `should_be_closed`, a
/// result whose volume fell below [`MERGE_VOLUME_RATIO`] of the original is
/// discarded, the mesh restored, and 0 returned.
pub fn merge_coplanar_faces_in_mesh_set(
    mesh: &mut MeshSet,
    params: &GeomProcessingParams,
    should_be_closed: bool,
) -> Result<usize> {
    let mut backup = should_be_closed.then(|| (mesh.clone(), mesh.volume().abs()));
    let min_dot = 1.0 - params.eps_merge_aligned_edges_angle;
    let eps = params.eps_merge_points;

    mesh.recalc_planes();
    let mut changes = 0;

    loop {
        let mut pass = 0;
        let edges: Vec<EdgeKey> = mesh.edge_keys().collect();

        for ek in edges {
            let Some(rev) = mesh.paired_rev(ek) else {
                continue;
            };
            let (Some(fa), Some(fb)) = (mesh.edge(ek).map(|e| e.face), mesh.edge(rev).map(|e| e.face))
            else {
                continue;
            };
            if fa == fb {
                continue;
            }
            let (Some(plane_a), Some(plane_b)) = (mesh.face_plane(fa), mesh.face_plane(fb)) else {
                continue;
            };
            if plane_a.normal.dot(&plane_b.normal) <= min_dot {
                continue;
            }
            if mesh
                .face_points(fb)
                .iter()
                .any(|p| plane_a.signed_distance(p).abs() > eps)
            {
                continue;
            }

            let merged = match mesh.remove_edge_and_merge_faces(ek, params) {
                Ok(merged) => merged,
                Err(err) => {
                    if let Some((original, _)) = backup.take() {
                        *mesh = original;
                    }
                    return Err(err.into());
                }
            };
            if merged.is_some() {
                mesh.recalc_face_plane(fa);
                pass += 1;
            }
        }

        if pass == 0 {
            break;
        }
        changes += pass;
    }

    if changes == 0 {
        return Ok(0);
    }

    if let Some((original, volume_before)) = backup {
        let volume_after = mesh.volume().abs();
        if volume_after < MERGE_VOLUME_RATIO * volume_before {
            tracing::warn!(
                volume_before,
                volume_after,
                "coplanar merge lost volume, restoring"
            );
            params.emit(Diagnostic::StageRejected {
                stage: "merge coplanar faces",
                reason: format!(
                    "volume dropped from {} to {}",
                    volume_before, volume_after
                ),
            });
            *mesh = original;
            return Ok(0);
        }
    }

    mesh.remove_unreferenced_vertices();
    tracing::debug!(changes, faces = mesh.face_count(), "merged coplanar faces");
    Ok(changes)
}

/// Runs [`MeshSet::merge_aligned_edges`] to a fixed point.
///
/// The loop is bounded by the starting edge count, since every productive
/// pass removes at least one edge. Returns the total number of half-edges
/// removed.
pub fn merge_aligned_edges_in_mesh_set(mesh: &mut MeshSet, params: &GeomProcessingParams) -> usize {
    let max_passes = mesh.edge_count();
    let mut total = 0;

    for _ in 0..max_passes {
        let removed = mesh.merge_aligned_edges(params);
        if removed == 0 {
            break;
        }
        total += removed;
    }

    if total > 0 {
        mesh.remove_unreferenced_vertices();
        mesh.rebuild_shells();
        mesh.recalc_planes();
        tracing::debug!(removed = total, "merged aligned edges");
    }
    total
}
