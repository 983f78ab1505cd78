// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh validation and defect reporting.
//!
//! [`check_mesh_set_valid_and_closed`] is a read-only walk over every face
//! cycle. It never fails: a badly malformed mesh yields a [`MeshSetInfo`]
//! with `mesh_set_valid == false`. Pointer consistency is checked first and
//! short-circuits the geometric pass, because traversing a corrupt graph can
//! loop or read removed elements.
//!
//! Traversal order is face-arena order, then cycle order from each anchor
//! edge. The defect lists are sets; which half of a fin pair is listed first
//! is not part of the contract.

use std::fmt;

use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::arena::MeshSet;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::params::GeomProcessingParams;

/// Result of a validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshSetInfo {
    /// Distinct vertices referenced by edges.
    pub num_vertices: usize,
    pub num_faces: usize,
    /// Half-edges visited by the face walk.
    pub num_edges: usize,
    /// Half-edges with a reciprocal reverse partner.
    pub num_closed_edges: usize,
    /// Half-edges without a reciprocal reverse partner.
    pub open_edges: Vec<EdgeKey>,
    /// Half-edges shorter than the point tolerance.
    pub degenerate_edges: Vec<EdgeKey>,
    /// Faces with area below the squared point tolerance.
    pub zero_area_faces: Vec<FaceKey>,
    /// Paired half-edges whose two faces have anti-parallel normals.
    pub fin_edges: Vec<EdgeKey>,
    pub surface_area: f64,
    /// `false` if next/prev/rev/face links are inconsistent.
    pub all_pointers_valid: bool,
    /// Overall verdict: closed, manifold-linked, free of disallowed defects.
    pub mesh_set_valid: bool,
    /// Human-readable summary.
    pub details: String,
}

impl MeshSetInfo {
    pub fn num_open_edges(&self) -> usize {
        self.open_edges.len()
    }

    /// Degenerate edges plus zero-area faces.
    pub fn num_degenerate(&self) -> usize {
        self.degenerate_edges.len() + self.zero_area_faces.len()
    }

    /// Every half-edge has a reverse partner.
    pub fn is_closed(&self) -> bool {
        self.all_pointers_valid && self.open_edges.is_empty()
    }

    /// Lexicographic quality key; lower is better for boolean operations.
    ///
    /// Order: pointer corruption, open edges, degenerate elements, invalid
    /// verdict, referenced vertices, faces.
    pub fn bool_op_rank(&self) -> (bool, usize, usize, bool, usize, usize) {
        (
            !self.all_pointers_valid,
            self.open_edges.len(),
            self.num_degenerate(),
            !self.mesh_set_valid,
            self.num_vertices,
            self.num_faces,
        )
    }

    /// `self` is strictly preferable to `reference` as boolean-operation input.
    pub fn is_better_for_bool_op(&self, reference: &MeshSetInfo) -> bool {
        self.bool_op_rank() < reference.bool_op_rank()
    }

    /// `self` is at least as good as `reference`.
    pub fn is_not_worse_for_bool_op(&self, reference: &MeshSetInfo) -> bool {
        self.bool_op_rank() <= reference.bool_op_rank()
    }
}

/// Free-function form of [`MeshSetInfo::is_better_for_bool_op`].
pub fn is_better_for_bool_op(candidate: &MeshSetInfo, reference: &MeshSetInfo) -> bool {
    candidate.is_better_for_bool_op(reference)
}

impl fmt::Display for MeshSetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} faces, {} edges, {} vertices, {} open, {} degenerate edges, {} zero-area faces, {} fins, valid: {}",
            self.num_faces,
            self.num_edges,
            self.num_vertices,
            self.open_edges.len(),
            self.degenerate_edges.len(),
            self.zero_area_faces.len(),
            self.fin_edges.len(),
            self.mesh_set_valid
        )
    }
}

impl MeshSet {
    /// Verifies the next/prev/rev/face links of every face cycle and the
    /// shell membership lists.
    ///
    /// Walks are bounded by `max_num_face_edges`; a cycle that does not close
    /// within the bound is reported as corrupt.
    pub fn check_pointers(&self, max_num_face_edges: usize) -> Result<()> {
        let limit = max_num_face_edges.min(self.edges.len()).max(1);
        let mut visited = 0usize;

        for (fk, face) in &self.faces {
            let start = face.edge;
            if !self.edges.contains_key(start) {
                return Err(Error::CorruptTopology(format!(
                    "face {:?} anchor edge {:?} does not exist",
                    fk, start
                )));
            }

            let mut ek = start;
            let mut count = 0usize;
            loop {
                let edge = self.edges.get(ek).ok_or_else(|| {
                    Error::CorruptTopology(format!("face {:?} reaches removed edge {:?}", fk, ek))
                })?;
                if edge.face != fk {
                    return Err(Error::CorruptTopology(format!(
                        "edge {:?} in cycle of face {:?} belongs to face {:?}",
                        ek, fk, edge.face
                    )));
                }
                if !self.vertices.contains_key(edge.vert) {
                    return Err(Error::VertexNotFound(edge.vert));
                }
                match self.edges.get(edge.next) {
                    Some(next) if next.prev == ek => {}
                    _ => {
                        return Err(Error::CorruptTopology(format!(
                            "edge {:?}: next.prev does not point back",
                            ek
                        )))
                    }
                }
                if let Some(rev) = edge.rev {
                    if !self.edges.contains_key(rev) {
                        return Err(Error::CorruptTopology(format!(
                            "edge {:?} has removed reverse {:?}",
                            ek, rev
                        )));
                    }
                }

                count += 1;
                if count > limit {
                    return Err(Error::CorruptTopology(format!(
                        "cycle of face {:?} does not close within {} edges",
                        fk, limit
                    )));
                }
                ek = edge.next;
                if ek == start {
                    break;
                }
            }

            if count != face.n_edges {
                return Err(Error::CorruptTopology(format!(
                    "face {:?} caches {} edges but its cycle has {}",
                    fk, face.n_edges, count
                )));
            }
            visited += count;
        }

        if visited != self.edges.len() {
            return Err(Error::CorruptTopology(format!(
                "{} edges are not part of any face cycle",
                self.edges.len() - visited
            )));
        }

        let mut seen: FxHashSet<FaceKey> = FxHashSet::default();
        for shell in &self.shells {
            for &fk in &shell.faces {
                if !self.faces.contains_key(fk) {
                    return Err(Error::FaceNotFound(fk));
                }
                if !seen.insert(fk) {
                    return Err(Error::CorruptTopology(format!(
                        "face {:?} listed in more than one shell",
                        fk
                    )));
                }
            }
        }
        if seen.len() != self.faces.len() {
            return Err(Error::CorruptTopology(format!(
                "{} faces are not part of any shell",
                self.faces.len() - seen.len()
            )));
        }

        Ok(())
    }
}

/// Validates a mesh set and reports its defects.
///
/// Never mutates the mesh and never fails.
pub fn check_mesh_set_valid_and_closed(
    mesh: &MeshSet,
    params: &GeomProcessingParams,
) -> MeshSetInfo {
    let mut info = MeshSetInfo {
        num_faces: mesh.face_count(),
        ..MeshSetInfo::default()
    };

    if let Err(err) = mesh.check_pointers(params.max_num_face_edges) {
        info.num_edges = mesh.edge_count();
        info.details = err.to_string();
        tracing::debug!(error = %err, "mesh pointer check failed");
        return info;
    }
    info.all_pointers_valid = true;

    let eps_sq = params.eps_merge_points_sq();
    let fin_threshold = -1.0 + params.eps_merge_aligned_edges_angle;
    let mut normals: FxHashMap<FaceKey, Option<Vector3<f64>>> =
        FxHashMap::with_capacity_and_hasher(mesh.face_count(), Default::default());

    for fk in mesh.face_keys() {
        let area = mesh.face_area(fk);
        info.surface_area += area;
        if area < eps_sq {
            info.zero_area_faces.push(fk);
        }

        for ek in mesh.face_edges(fk) {
            info.num_edges += 1;

            let paired_rev = mesh
                .edge(ek)
                .and_then(|e| e.rev)
                .filter(|&rev| mesh.edge(rev).and_then(|r| r.rev) == Some(ek));

            match paired_rev {
                Some(rev) => {
                    info.num_closed_edges += 1;
                    let other = mesh.edge(rev).map(|r| r.face);
                    if let Some(other) = other.filter(|&o| o != fk) {
                        let n_a = *normals.entry(fk).or_insert_with(|| mesh.face_normal(fk));
                        let n_b = *normals
                            .entry(other)
                            .or_insert_with(|| mesh.face_normal(other));
                        if let (Some(n_a), Some(n_b)) = (n_a, n_b) {
                            if n_a.dot(&n_b) < fin_threshold {
                                info.fin_edges.push(ek);
                            }
                        }
                    }
                }
                None => info.open_edges.push(ek),
            }

            if mesh.edge_length2(ek).is_some_and(|len2| len2 < eps_sq) {
                info.degenerate_edges.push(ek);
            }
        }
    }

    info.num_vertices = mesh.referenced_vertex_count();
    info.mesh_set_valid = info.open_edges.is_empty()
        && info.degenerate_edges.is_empty()
        && (params.allow_zero_area_faces || info.zero_area_faces.is_empty())
        && (params.allow_fin_edges || info.fin_edges.is_empty());

    info.details = if info.mesh_set_valid {
        String::from("mesh set is closed and valid")
    } else {
        let mut parts = Vec::new();
        if !info.open_edges.is_empty() {
            parts.push(format!("{} open edges", info.open_edges.len()));
        }
        if !info.degenerate_edges.is_empty() {
            parts.push(format!("{} degenerate edges", info.degenerate_edges.len()));
        }
        if !info.zero_area_faces.is_empty() {
            parts.push(format!("{} zero-area faces", info.zero_area_faces.len()));
        }
        if !info.fin_edges.is_empty() {
            parts.push(format!("{} fin edges", info.fin_edges.len()));
        }
        parts.join(", ")
    };

    info
}
