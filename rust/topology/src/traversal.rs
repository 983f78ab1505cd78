// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal of half-edge cycles and connected components.
//!
//! Adjacency is never stored explicitly: face boundaries are found by walking
//! `next`, and neighbours by following `rev`. Every walk is bounded by the
//! arena size so a corrupted cycle cannot loop forever.

use nalgebra::Point3;
use rustc_hash::FxHashMap;

use crate::arena::{MeshSet, Shell};
use crate::keys::*;

/// Iterator over the edge cycle of a face.
pub struct FaceEdges<'a> {
    mesh: &'a MeshSet,
    start: EdgeKey,
    current: Option<EdgeKey>,
    remaining: usize,
}

impl Iterator for FaceEdges<'_> {
    type Item = EdgeKey;

    fn next(&mut self) -> Option<EdgeKey> {
        let current = self.current?;
        if self.remaining == 0 {
            self.current = None;
            return None;
        }
        self.remaining -= 1;

        let next = self.mesh.edges.get(current).map(|e| e.next);
        self.current = match next {
            Some(n) if n != self.start => Some(n),
            _ => None,
        };
        Some(current)
    }
}

impl MeshSet {
    /// Walks the edge cycle of a face starting at its anchor edge.
    ///
    /// Yields at most `edge_count()` edges, so a cycle that never returns to
    /// its anchor terminates.
    pub fn face_edges(&self, face: FaceKey) -> FaceEdges<'_> {
        let start = self.faces.get(face).map(|f| f.edge);
        FaceEdges {
            mesh: self,
            start: start.unwrap_or_default(),
            current: start.filter(|&e| self.edges.contains_key(e)),
            remaining: self.edges.len(),
        }
    }

    /// Collects the edge keys of a face in cycle order.
    pub fn face_edge_keys(&self, face: FaceKey) -> Vec<EdgeKey> {
        self.face_edges(face).collect()
    }

    /// Returns the vertex keys of a face in cycle order.
    pub fn face_vertices(&self, face: FaceKey) -> Vec<VertexKey> {
        self.face_edges(face)
            .filter_map(|ek| self.edges.get(ek).map(|e| e.vert))
            .collect()
    }

    /// Returns the vertex positions of a face in cycle order.
    pub fn face_points(&self, face: FaceKey) -> Vec<Point3<f64>> {
        self.face_edges(face)
            .filter_map(|ek| {
                let edge = self.edges.get(ek)?;
                self.vertex_position(edge.vert)
            })
            .collect()
    }

    /// Returns the end vertex of an edge (the start vertex of its successor).
    pub fn edge_end(&self, edge: EdgeKey) -> Option<VertexKey> {
        let next = self.edges.get(edge)?.next;
        self.edges.get(next).map(|e| e.vert)
    }

    /// Returns the start and end positions of an edge.
    pub fn edge_points(&self, edge: EdgeKey) -> Option<(Point3<f64>, Point3<f64>)> {
        let start = self.vertex_position(self.edges.get(edge)?.vert)?;
        let end = self.vertex_position(self.edge_end(edge)?)?;
        Some((start, end))
    }

    /// Returns the face on the other side of an edge, if the edge is paired.
    pub fn adjacent_face(&self, edge: EdgeKey) -> Option<FaceKey> {
        let rev = self.edges.get(edge)?.rev?;
        self.edges.get(rev).map(|e| e.face)
    }

    /// Counts outgoing half-edges per vertex.
    ///
    /// This is the vertex-adjacency cache used by aligned-edge merging; it is
    /// rebuilt per pass because surgery invalidates it.
    pub fn vertex_out_degree(&self) -> FxHashMap<VertexKey, usize> {
        let mut degree: FxHashMap<VertexKey, usize> =
            FxHashMap::with_capacity_and_hasher(self.vertices.len(), Default::default());
        for edge in self.edges.values() {
            *degree.entry(edge.vert).or_insert(0) += 1;
        }
        degree
    }

    /// Number of distinct vertices referenced by at least one edge.
    pub fn referenced_vertex_count(&self) -> usize {
        self.vertex_out_degree().len()
    }

    /// Recomputes the shells as connected components over `rev` links.
    ///
    /// Components are ordered by their first face in arena order, and faces
    /// within a component in discovery order.
    pub fn rebuild_shells(&mut self) {
        let mut component: FxHashMap<FaceKey, usize> =
            FxHashMap::with_capacity_and_hasher(self.faces.len(), Default::default());
        let mut shells: Vec<Shell> = Vec::new();
        let mut stack: Vec<FaceKey> = Vec::new();

        for seed in self.faces.keys() {
            if component.contains_key(&seed) {
                continue;
            }
            let index = shells.len();
            let mut shell = Shell::default();
            component.insert(seed, index);
            stack.push(seed);

            while let Some(face) = stack.pop() {
                shell.faces.push(face);
                for ek in self.face_edges(face) {
                    if let Some(neighbour) = self.adjacent_face(ek) {
                        if self.faces.contains_key(neighbour) && !component.contains_key(&neighbour) {
                            component.insert(neighbour, index);
                            stack.push(neighbour);
                        }
                    }
                }
            }
            shells.push(shell);
        }

        self.shells = shells;
    }
}
