// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Full mesh reconstruction through face triangulation.
//!
//! This is the fallback of last resort: every face is triangulated in its
//! own plane and the triangles are fed through [`PolyInputCache3D`], which
//! merges points and drops degenerate triangles before a fresh half-edge
//! structure is built.

use ifc_mend_topology::{GeomProcessingParams, MeshSet};

use crate::error::Result;
use crate::point_cache::PolyInputCache3D;
use crate::triangulation::triangulate_face;

/// Rebuilds `mesh` as a triangle mesh.
///
/// Zero-area faces are skipped. A face earcut cannot handle fails the whole
/// rebuild, leaving the decision to the caller.
pub fn retriangulate_mesh_set(mesh: &MeshSet, params: &GeomProcessingParams) -> Result<MeshSet> {
    let mut cache = PolyInputCache3D::from_params(params);
    let mut skipped = 0usize;

    for fk in mesh.face_keys() {
        let Some(normal) = mesh.face_normal(fk) else {
            skipped += 1;
            continue;
        };
        let points = mesh.face_points(fk);
        let indices: Vec<usize> = points.iter().map(|&p| cache.add_point(p)).collect();

        for [a, b, c] in triangulate_face(&points, &normal)? {
            cache.add_face_check_indexes(&[indices[a], indices[b], indices[c]]);
        }
    }

    let rebuilt = cache.build_mesh_set()?;
    tracing::debug!(
        faces_in = mesh.face_count(),
        triangles = rebuilt.face_count(),
        skipped,
        "retriangulated mesh set"
    );
    Ok(rebuilt)
}

/// `true` if every face of the mesh is a triangle.
pub fn is_triangulated(mesh: &MeshSet) -> bool {
    mesh.face_keys()
        .all(|fk| mesh.face(fk).is_some_and(|f| f.n_edges == 3))
}
