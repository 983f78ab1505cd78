// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topological surgery on half-edge mesh sets.
//!
//! Every primitive validates its preconditions before touching a link, so a
//! rejected call leaves the mesh exactly as it was. The only error is
//! [`Error::FaceEdgeLimitExceeded`], raised when a splice would produce a
//! face longer than the configured bound.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::arena::MeshSet;
use crate::error::{Error, Result};
use crate::keys::*;
use crate::params::GeomProcessingParams;

/// Contiguous run of edges shared by two faces.
///
/// `first..=last` walks forward in the cycle of `face_a`; their reverses run
/// `last_rev..=first_rev` forward in the cycle of `face_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedRun {
    pub face_a: FaceKey,
    pub face_b: FaceKey,
    pub first: EdgeKey,
    pub last: EdgeKey,
    pub first_rev: EdgeKey,
    pub last_rev: EdgeKey,
    pub len: usize,
}

impl MeshSet {
    /// Reverse partner of an edge, if the pairing is reciprocal.
    pub fn paired_rev(&self, edge: EdgeKey) -> Option<EdgeKey> {
        let rev = self.edges.get(edge)?.rev?;
        (self.edges.get(rev)?.rev == Some(edge)).then_some(rev)
    }

    /// Detaches a face from the arena and from its shell.
    ///
    /// Edges still pointing at the face are left alone; the caller relinks
    /// or removes them. Returns `false` if the face did not exist.
    pub fn remove_face_from_mesh(&mut self, face: FaceKey) -> bool {
        if self.faces.remove(face).is_none() {
            return false;
        }
        for shell in &mut self.shells {
            shell.faces.retain(|&fk| fk != face);
        }
        self.shells.retain(|shell| !shell.faces.is_empty());
        true
    }

    /// Finds the maximal run of contiguous edges shared between the face of
    /// `edge` and the face across it.
    ///
    /// Returns `None` when the edge is open, self-adjacent, or when the run
    /// would swallow the whole boundary of either face.
    pub fn shared_boundary(&self, edge: EdgeKey) -> Option<SharedRun> {
        let face_a = self.edges.get(edge)?.face;
        let rev = self.paired_rev(edge)?;
        let face_b = self.edges.get(rev)?.face;
        if face_a == face_b {
            return None;
        }
        let n_a = self.faces.get(face_a)?.n_edges;
        let n_b = self.faces.get(face_b)?.n_edges;

        let rev_in_b = |ek: EdgeKey| -> Option<EdgeKey> {
            let r = self.paired_rev(ek)?;
            (self.edges.get(r)?.face == face_b).then_some(r)
        };

        let (mut first, mut first_rev) = (edge, rev);
        let (mut last, mut last_rev) = (edge, rev);
        let mut len = 1;

        while len < n_a {
            let next = self.edges.get(last)?.next;
            let Some(next_rev) = rev_in_b(next) else {
                break;
            };
            if self.edges.get(last_rev)?.prev != next_rev {
                break;
            }
            last = next;
            last_rev = next_rev;
            len += 1;
        }

        while len < n_a {
            let prev = self.edges.get(first)?.prev;
            let Some(prev_rev) = rev_in_b(prev) else {
                break;
            };
            if self.edges.get(first_rev)?.next != prev_rev {
                break;
            }
            first = prev;
            first_rev = prev_rev;
            len += 1;
        }

        if len >= n_a || len >= n_b {
            return None;
        }

        Some(SharedRun {
            face_a,
            face_b,
            first,
            last,
            first_rev,
            last_rev,
            len,
        })
    }

    /// Splices the cycles of the two faces across `edge` into the cycle of
    /// the face owning `edge`, deleting the shared run.
    ///
    /// Edge counts, the surviving face's anchor, and removal of the face
    /// across `edge` are left to the caller; read that face before calling.
    /// Returns the surviving edge preceding the splice, or `None` if the
    /// faces cannot be merged.
    pub fn check_merge_faces(&mut self, edge: EdgeKey) -> Option<EdgeKey> {
        let run = self.shared_boundary(edge)?;
        Some(self.splice_shared_run(&run))
    }

    fn splice_shared_run(&mut self, run: &SharedRun) -> EdgeKey {
        let a_before = self.edges[run.first].prev;
        let a_after = self.edges[run.last].next;
        let b_before = self.edges[run.last_rev].prev;
        let b_after = self.edges[run.first_rev].next;
        let b_remaining = self.faces[run.face_b].n_edges - run.len;

        let mut doomed: SmallVec<[EdgeKey; 8]> = SmallVec::with_capacity(run.len * 2);
        let mut ek = run.first;
        for _ in 0..run.len {
            doomed.push(ek);
            if let Some(rev) = self.edges[ek].rev {
                doomed.push(rev);
            }
            ek = self.edges[ek].next;
        }

        self.edges[a_before].next = b_after;
        self.edges[b_after].prev = a_before;
        self.edges[b_before].next = a_after;
        self.edges[a_after].prev = b_before;

        let mut ek = b_after;
        for _ in 0..b_remaining {
            self.edges[ek].face = run.face_a;
            ek = self.edges[ek].next;
        }

        for ek in doomed {
            self.edges.remove(ek);
        }

        a_before
    }

    /// Merges the two faces on either side of `edge` into one.
    ///
    /// All contiguous edges the faces share are removed, not just `edge`.
    /// Returns `Ok(None)` without mutating when the edge is open, bounds the
    /// same face on both sides, or is part of a run covering a whole face.
    pub fn remove_edge_and_merge_faces(
        &mut self,
        edge: EdgeKey,
        params: &GeomProcessingParams,
    ) -> Result<Option<EdgeKey>> {
        let Some(run) = self.shared_boundary(edge) else {
            return Ok(None);
        };

        let merged = self.faces[run.face_a].n_edges + self.faces[run.face_b].n_edges - 2 * run.len;
        if merged > params.max_num_face_edges {
            return Err(Error::FaceEdgeLimitExceeded {
                face: run.face_a,
                count: merged,
                max: params.max_num_face_edges,
            });
        }
        if merged < 3 {
            return Ok(None);
        }

        let survivor = self.splice_shared_run(&run);
        let face = &mut self.faces[run.face_a];
        face.edge = survivor;
        face.n_edges = merged;
        face.plane = None;
        self.remove_face_from_mesh(run.face_b);

        Ok(Some(survivor))
    }

    /// One pass of colinear vertex removal.
    ///
    /// A vertex qualifies when exactly two half-edges leave it (one on a
    /// boundary), its incoming and outgoing edges point the same way within
    /// the angle tolerance, and every face touching it keeps at least three
    /// edges. The shorter of the two edges is deleted on each side.
    ///
    /// Returns the number of half-edges removed. Call until it returns 0.
    pub fn merge_aligned_edges(&mut self, params: &GeomProcessingParams) -> usize {
        let eps_sq = params.eps_merge_points_sq();
        let min_dot = 1.0 - params.eps_merge_aligned_edges_angle;
        let mut degree = self.vertex_out_degree();
        let candidates: Vec<EdgeKey> = self.edges.keys().collect();
        let mut removed = 0;

        for a in candidates {
            let Some(collapse) = self.aligned_collapse(a, &degree, eps_sq, min_dot) else {
                continue;
            };
            degree.remove(&collapse.vertex);
            removed += self.apply_collapse(&collapse);
        }

        if removed > 0 {
            tracing::trace!(removed, "merged aligned edges");
        }
        removed
    }

    fn aligned_collapse(
        &self,
        a: EdgeKey,
        degree: &FxHashMap<VertexKey, usize>,
        eps_sq: f64,
        min_dot: f64,
    ) -> Option<Collapse> {
        let edge_a = self.edges.get(a)?;
        let b = edge_a.next;
        let edge_b = self.edges.get(b)?;
        let vertex = edge_b.vert;
        let face = edge_a.face;
        if self.faces.get(face)?.n_edges <= 3 {
            return None;
        }

        let sides = match (edge_a.rev, edge_b.rev) {
            (None, None) => {
                if degree.get(&vertex).copied() != Some(1) {
                    return None;
                }
                None
            }
            (Some(a_rev), Some(b_rev)) => {
                if degree.get(&vertex).copied() != Some(2) {
                    return None;
                }
                if self.paired_rev(a) != Some(a_rev) || self.paired_rev(b) != Some(b_rev) {
                    return None;
                }
                if self.edges.get(b_rev)?.next != a_rev {
                    return None;
                }
                let other = self.edges.get(a_rev)?.face;
                if other == face || self.faces.get(other)?.n_edges <= 3 {
                    return None;
                }
                Some((a_rev, b_rev, other))
            }
            _ => return None,
        };

        let (start, mid) = self.edge_points(a)?;
        let (_, end) = self.edge_points(b)?;
        let dir_a: Vector3<f64> = mid - start;
        let dir_b: Vector3<f64> = end - mid;
        let (len_a2, len_b2) = (dir_a.norm_squared(), dir_b.norm_squared());
        if len_a2 <= eps_sq || len_b2 <= eps_sq {
            return None;
        }
        if dir_a.dot(&dir_b) / (len_a2.sqrt() * len_b2.sqrt()) <= min_dot {
            return None;
        }

        Some(Collapse {
            a,
            b,
            vertex,
            face,
            sides,
            keep_a: len_b2 <= len_a2,
        })
    }

    fn apply_collapse(&mut self, c: &Collapse) -> usize {
        let mut removed = 1;
        if c.keep_a {
            let after = self.edges[c.b].next;
            self.edges[c.a].next = after;
            self.edges[after].prev = c.a;
            if let Some((a_rev, b_rev, other)) = c.sides {
                let b_rev_data = &self.edges[b_rev];
                let (far, before) = (b_rev_data.vert, b_rev_data.prev);
                self.edges[a_rev].vert = far;
                self.edges[a_rev].prev = before;
                self.edges[before].next = a_rev;
                self.shrink_face(other, b_rev, a_rev);
                self.edges.remove(b_rev);
                removed += 1;
            }
            self.shrink_face(c.face, c.b, c.a);
            self.edges.remove(c.b);
        } else {
            let before = self.edges[c.a].prev;
            let start = self.edges[c.a].vert;
            self.edges[c.b].vert = start;
            self.edges[c.b].prev = before;
            self.edges[before].next = c.b;
            if let Some((a_rev, b_rev, other)) = c.sides {
                let after = self.edges[a_rev].next;
                self.edges[b_rev].next = after;
                self.edges[after].prev = b_rev;
                self.shrink_face(other, a_rev, b_rev);
                self.edges.remove(a_rev);
                removed += 1;
            }
            self.shrink_face(c.face, c.a, c.b);
            self.edges.remove(c.a);
        }
        removed
    }

    fn shrink_face(&mut self, face: FaceKey, removed: EdgeKey, replacement: EdgeKey) {
        let data = &mut self.faces[face];
        if data.edge == removed {
            data.edge = replacement;
        }
        data.n_edges -= 1;
        data.plane = None;
    }

    /// Reverses the orientation of every face in a shell.
    ///
    /// Reverse pairings stay valid: both halves of a pair flip together.
    pub fn invert_shell(&mut self, shell: usize) {
        let Some(faces) = self.shells.get(shell).map(|s| s.faces.clone()) else {
            return;
        };
        for fk in faces {
            let keys = self.face_edge_keys(fk);
            let ends: SmallVec<[VertexKey; 8]> = keys
                .iter()
                .filter_map(|&ek| self.edge_end(ek))
                .collect();
            if ends.len() != keys.len() {
                continue;
            }
            for (&ek, &end) in keys.iter().zip(&ends) {
                let edge = &mut self.edges[ek];
                edge.vert = end;
                std::mem::swap(&mut edge.next, &mut edge.prev);
            }
            if let Some(face) = self.faces.get_mut(fk) {
                face.plane = None;
            }
        }
    }

    /// Orients every closed shell so its faces point away from the solid.
    ///
    /// A shell nested inside an odd number of other closed shells bounds a
    /// cavity and must enclose negative volume; every other closed shell
    /// must enclose positive volume. Shells that disagree are inverted.
    /// Returns the number of shells inverted. Open shells are left alone.
    pub fn orient_closed_shells_outward(&mut self) -> usize {
        let closed: Vec<usize> = (0..self.shells.len())
            .filter(|&index| self.is_shell_closed(index))
            .collect();

        let flips: Vec<usize> = closed
            .iter()
            .copied()
            .filter(|&index| {
                let volume = self.shell_volume(index);
                if volume == 0.0 {
                    return false;
                }
                let Some(sample) = self.shell_sample_point(index) else {
                    return false;
                };
                let depth = closed
                    .iter()
                    .filter(|&&other| {
                        other != index && self.shell_winding_number(other, &sample).abs() > 0.5
                    })
                    .count();
                let cavity = depth % 2 == 1;
                (volume < 0.0) != cavity
            })
            .collect();

        for &index in &flips {
            self.invert_shell(index);
        }
        if !flips.is_empty() {
            tracing::debug!(inverted = flips.len(), "reoriented closed shells");
        }
        flips.len()
    }

    fn is_shell_closed(&self, shell: usize) -> bool {
        self.shells[shell]
            .faces
            .iter()
            .all(|&fk| self.face_edges(fk).all(|ek| self.paired_rev(ek).is_some()))
    }

    /// Any vertex of the shell.
    fn shell_sample_point(&self, shell: usize) -> Option<Point3<f64>> {
        let face = *self.shells.get(shell)?.faces.first()?;
        self.face_points(face).first().copied()
    }

    /// Drops vertices that no edge starts from. Returns how many were removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        let referenced = self.vertex_out_degree();
        let before = self.vertices.len();
        self.vertices.retain(|vk, _| referenced.contains_key(&vk));
        before - self.vertices.len()
    }
}

struct Collapse {
    a: EdgeKey,
    b: EdgeKey,
    vertex: VertexKey,
    face: FaceKey,
    /// `(a.rev, b.rev, their face)` for an interior vertex.
    sides: Option<(EdgeKey, EdgeKey, FaceKey)>,
    keep_a: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::*;
    use crate::validate::check_mesh_set_valid_and_closed;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn params() -> GeomProcessingParams {
        GeomProcessingParams::default()
    }

    fn shared_edge(mesh: &MeshSet) -> EdgeKey {
        mesh.edge_keys()
            .find(|&ek| mesh.paired_rev(ek).is_some())
            .unwrap()
    }

    /// Two quads sharing the two contiguous edges 1-2 and 2-3.
    fn quads_sharing_two_edges() -> MeshSet {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.5, 1.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
        ];
        MeshSet::from_polygons(&points, &[[0usize, 1, 2, 3], [3, 2, 1, 4]]).unwrap()
    }

    #[test]
    fn split_quad_merges_into_one_face() {
        let mut mesh = split_quad();
        let boundary = mesh.open_boundary_length();
        let edge = shared_edge(&mesh);

        let survivor = mesh.remove_edge_and_merge_faces(edge, &params()).unwrap();
        assert!(survivor.is_some());
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 4);
        assert_eq!(mesh.shell_count(), 1);

        let face = mesh.face_keys().next().unwrap();
        assert_eq!(mesh.face(face).unwrap().n_edges, 4);
        assert!(mesh.check_pointers(100).is_ok());
        assert_relative_eq!(mesh.open_boundary_length(), boundary, epsilon = 1e-12);
    }

    #[test]
    fn contiguous_shared_run_is_removed_whole() {
        let mut mesh = quads_sharing_two_edges();
        let edge = shared_edge(&mesh);
        let run = mesh.shared_boundary(edge).unwrap();
        assert_eq!(run.len, 2);

        mesh.remove_edge_and_merge_faces(edge, &params()).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 4);
        assert!(mesh.check_pointers(100).is_ok());
        assert_eq!(mesh.remove_unreferenced_vertices(), 1);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn every_edge_of_a_run_finds_the_same_run() {
        let mesh = quads_sharing_two_edges();
        let runs: Vec<SharedRun> = mesh
            .edge_keys()
            .filter_map(|ek| mesh.shared_boundary(ek))
            .collect();
        assert_eq!(runs.len(), 4);
        assert!(runs.iter().all(|r| r.len == 2));
    }

    #[test]
    fn fully_shared_faces_are_not_merged() {
        let mut mesh = back_to_back_triangles();
        let edge = shared_edge(&mesh);
        assert!(mesh.shared_boundary(edge).is_none());
        assert_eq!(mesh.remove_edge_and_merge_faces(edge, &params()).unwrap(), None);
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 6);
    }

    #[test]
    fn open_edge_is_a_no_op() {
        let mut mesh = split_quad();
        let open = mesh
            .edge_keys()
            .find(|&ek| mesh.paired_rev(ek).is_none())
            .unwrap();
        assert_eq!(mesh.remove_edge_and_merge_faces(open, &params()).unwrap(), None);
        assert_eq!(mesh.face_count(), 2);
    }

    #[test]
    fn edge_limit_is_fatal_and_leaves_mesh_untouched() {
        let mut mesh = split_quad();
        let edge = shared_edge(&mesh);
        let tight = params().with_max_num_face_edges(3);

        let err = mesh.remove_edge_and_merge_faces(edge, &tight).unwrap_err();
        assert!(matches!(
            err,
            Error::FaceEdgeLimitExceeded { count: 4, max: 3, .. }
        ));
        assert!(err.is_structural());
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 6);
        assert!(mesh.check_pointers(100).is_ok());
    }

    #[test]
    fn check_merge_faces_leaves_bookkeeping_to_caller() {
        let mut mesh = split_quad();
        let edge = shared_edge(&mesh);
        let other = mesh.adjacent_face(edge).unwrap();
        let survivor = mesh.check_merge_faces(edge).unwrap();

        // Counts are stale until the caller fixes them up
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.edge_count(), 4);
        let face = mesh.edge(survivor).unwrap().face;
        assert!(mesh.remove_face_from_mesh(other));
        assert!(!mesh.remove_face_from_mesh(other));
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.shells()[0].faces, vec![face]);
    }

    #[test]
    fn midpoint_on_cube_edge_is_collapsed() {
        let mut mesh = cube_with_midpoint();
        assert_eq!(mesh.edge_count(), 26);

        assert_eq!(mesh.merge_aligned_edges(&params()), 2);
        assert_eq!(mesh.merge_aligned_edges(&params()), 0);
        assert_eq!(mesh.edge_count(), 24);
        assert_eq!(mesh.remove_unreferenced_vertices(), 1);

        let info = check_mesh_set_valid_and_closed(&mesh, &params());
        assert!(info.mesh_set_valid, "{}", info.details);
        assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn boundary_midpoint_is_collapsed() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.4, 0.0),
        ];
        let mut mesh = MeshSet::from_polygons(&points, &[[0usize, 1, 4, 2, 3]]).unwrap();

        assert_eq!(mesh.merge_aligned_edges(&params()), 1);
        let face = mesh.face_keys().next().unwrap();
        assert_eq!(mesh.face(face).unwrap().n_edges, 4);
        assert!(mesh.check_pointers(100).is_ok());
        assert_relative_eq!(mesh.face_area(face), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn corners_are_not_collapsed() {
        let mut mesh = unit_cube();
        assert_eq!(mesh.merge_aligned_edges(&params()), 0);
        assert_eq!(mesh.edge_count(), 24);
    }

    #[test]
    fn inverted_cube_is_oriented_outward() {
        let mut mesh = unit_cube();
        mesh.invert_shell(0);
        assert_relative_eq!(mesh.volume(), -1.0, epsilon = 1e-12);
        assert!(check_mesh_set_valid_and_closed(&mesh, &params()).mesh_set_valid);

        assert_eq!(mesh.orient_closed_shells_outward(), 1);
        assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-12);
        assert_eq!(mesh.orient_closed_shells_outward(), 0);
    }

    #[test]
    fn open_shells_keep_their_orientation() {
        let mut mesh = split_quad();
        mesh.invert_shell(0);
        let normal = mesh.face_normal(mesh.face_keys().next().unwrap()).unwrap();
        assert_eq!(mesh.orient_closed_shells_outward(), 0);
        let after = mesh.face_normal(mesh.face_keys().next().unwrap()).unwrap();
        assert_relative_eq!(normal.z, after.z);
    }

    fn cavity_shell(mesh: &MeshSet) -> usize {
        (0..mesh.shell_count())
            .find(|&s| mesh.shell_volume(s) < 0.0)
            .unwrap()
    }

    #[test]
    fn cavity_shells_keep_facing_inward() {
        let mut mesh = hollow_box(false);
        assert_eq!(mesh.shell_count(), 2);
        assert_relative_eq!(mesh.volume(), 63.0, epsilon = 1e-9);

        assert_eq!(mesh.orient_closed_shells_outward(), 0);
        assert_relative_eq!(mesh.volume(), 63.0, epsilon = 1e-9);
    }

    #[test]
    fn wrongly_wound_cavity_is_turned_inward() {
        let mut mesh = hollow_box(false);
        let cavity = cavity_shell(&mesh);
        mesh.invert_shell(cavity);
        assert_relative_eq!(mesh.volume(), 65.0, epsilon = 1e-9);

        assert_eq!(mesh.orient_closed_shells_outward(), 1);
        assert_relative_eq!(mesh.volume(), 63.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.shell_volume(cavity), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn inside_out_hollow_box_is_fully_reoriented() {
        let mut mesh = hollow_box(false);
        for shell in 0..mesh.shell_count() {
            mesh.invert_shell(shell);
        }
        assert_relative_eq!(mesh.volume(), -63.0, epsilon = 1e-9);

        assert_eq!(mesh.orient_closed_shells_outward(), 2);
        assert_relative_eq!(mesh.volume(), 63.0, epsilon = 1e-9);
        assert!(check_mesh_set_valid_and_closed(&mesh, &params()).mesh_set_valid);
    }

    #[test]
    fn disjoint_solids_both_face_outward() {
        let mut mesh = two_cubes();
        assert_eq!(mesh.shell_count(), 2);
        mesh.invert_shell(1);

        assert_eq!(mesh.orient_closed_shells_outward(), 1);
        assert_relative_eq!(mesh.shell_volume(0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(mesh.shell_volume(1), 1.0, epsilon = 1e-12);
    }
}
