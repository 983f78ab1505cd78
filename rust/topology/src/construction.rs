// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of half-edge mesh sets from indexed polygons.
//!
//! Faces are created through the arena, which allocates their edge cycles and
//! links `next`/`prev`. Reverse partners are paired afterwards by matching
//! directed vertex pairs `(a, b)` against `(b, a)`.

use nalgebra::Point3;
use rustc_hash::FxHashMap;
use slotmap::Key;
use smallvec::SmallVec;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

impl MeshSet {
    /// Builds a mesh set from a point list and polygons given as point indices.
    ///
    /// Polygons are taken as-is (no point merging, no degenerate filtering);
    /// use the geometry crate's `PolyInputCache3D` for a cleaned rebuild.
    /// Reverse edges are paired and shells computed before returning.
    pub fn from_polygons<P: AsRef<[usize]>>(
        points: &[Point3<f64>],
        polygons: &[P],
    ) -> Result<Self> {
        let mut mesh = MeshSet::new();
        let vertex_keys: Vec<VertexKey> = points.iter().map(|p| mesh.add_vertex(*p)).collect();

        let mut cycle: SmallVec<[VertexKey; 8]> = SmallVec::new();
        for polygon in polygons {
            cycle.clear();
            for &index in polygon.as_ref() {
                let key = vertex_keys.get(index).ok_or(Error::InvalidVertexIndex {
                    index,
                    count: points.len(),
                })?;
                cycle.push(*key);
            }
            mesh.add_face(&cycle)?;
        }

        mesh.pair_reverse_edges();
        mesh.rebuild_shells();
        Ok(mesh)
    }

    /// Creates a face whose edge cycle visits the given vertices in order.
    ///
    /// Reverse partners are not linked; call [`MeshSet::pair_reverse_edges`]
    /// once all faces are in place.
    pub fn add_face(&mut self, vertices: &[VertexKey]) -> Result<FaceKey> {
        if vertices.len() < 3 {
            return Err(Error::DegenerateFace);
        }
        for &vk in vertices {
            if !self.vertices.contains_key(vk) {
                return Err(Error::VertexNotFound(vk));
            }
        }

        let face = self.faces.insert(FaceData {
            edge: EdgeKey::null(),
            n_edges: vertices.len(),
            plane: None,
        });

        let edge_keys: SmallVec<[EdgeKey; 8]> = vertices
            .iter()
            .map(|&vert| {
                self.edges.insert(HalfEdge {
                    vert,
                    next: EdgeKey::null(),
                    prev: EdgeKey::null(),
                    rev: None,
                    face,
                })
            })
            .collect();

        let n = edge_keys.len();
        for i in 0..n {
            let edge = &mut self.edges[edge_keys[i]];
            edge.next = edge_keys[(i + 1) % n];
            edge.prev = edge_keys[(i + n - 1) % n];
        }

        self.faces[face].edge = edge_keys[0];
        Ok(face)
    }

    /// Recomputes all reverse links from directed vertex pairs.
    ///
    /// An edge `a → b` is paired with an unpaired edge `b → a`. When a
    /// directed pair occurs more than once (non-manifold input), the surplus
    /// edges stay open. Pairing follows arena order and is deterministic.
    pub fn pair_reverse_edges(&mut self) {
        let keys: Vec<EdgeKey> = self.edges.keys().collect();
        for &ek in &keys {
            self.edges[ek].rev = None;
        }

        let mut unpaired: FxHashMap<(VertexKey, VertexKey), SmallVec<[EdgeKey; 2]>> =
            FxHashMap::with_capacity_and_hasher(keys.len(), Default::default());

        for &ek in &keys {
            let from = self.edges[ek].vert;
            let Some(to) = self.edge_end(ek) else {
                continue;
            };
            if from == to {
                continue;
            }

            let partner = unpaired.get_mut(&(to, from)).and_then(|list| list.pop());
            match partner {
                Some(rev) => {
                    self.edges[ek].rev = Some(rev);
                    self.edges[rev].rev = Some(ek);
                }
                None => unpaired.entry((from, to)).or_default().push(ek),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> MeshSet {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let faces = [[0usize, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        MeshSet::from_polygons(&points, &faces).unwrap()
    }

    #[test]
    fn tetrahedron_is_fully_paired() {
        let mesh = tetrahedron();
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.edge_count(), 12);
        assert_eq!(mesh.shell_count(), 1);

        for ek in mesh.edge_keys() {
            let rev = mesh.edge(ek).unwrap().rev.expect("closed mesh");
            assert_eq!(mesh.edge(rev).unwrap().rev, Some(ek));
        }
    }

    #[test]
    fn cycles_are_linked() {
        let mesh = tetrahedron();
        for ek in mesh.edge_keys() {
            let edge = mesh.edge(ek).unwrap();
            assert_eq!(mesh.edge(edge.next).unwrap().prev, ek);
            assert_eq!(mesh.edge(edge.prev).unwrap().next, ek);
        }
    }

    #[test]
    fn single_triangle_is_open() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = MeshSet::from_polygons(&points, &[[0usize, 1, 2]]).unwrap();
        assert!(mesh.edge_keys().all(|ek| mesh.edge(ek).unwrap().rev.is_none()));
    }

    #[test]
    fn duplicate_directed_edge_stays_open() {
        // Three triangles share edge 0-1; only one pair can be formed.
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, -1.0, 0.0),
            Point3::new(0.5, 0.0, 1.0),
        ];
        let faces = [[0usize, 1, 2], [1, 0, 3], [0, 1, 4]];
        let mesh = MeshSet::from_polygons(&points, &faces).unwrap();

        let paired = mesh
            .edge_keys()
            .filter(|&ek| mesh.edge(ek).unwrap().rev.is_some())
            .count();
        assert_eq!(paired, 2);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let result = MeshSet::from_polygons(&points, &[[0usize, 1, 7]]);
        assert!(matches!(
            result,
            Err(Error::InvalidVertexIndex { index: 7, count: 2 })
        ));
    }

    #[test]
    fn short_polygon_is_rejected() {
        let points = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let result = MeshSet::from_polygons(&points, &[vec![0usize, 1]]);
        assert!(matches!(result, Err(Error::DegenerateFace)));
    }
}
