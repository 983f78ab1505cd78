// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for half-edge meshes.
//!
//! The [`MeshSet`] is the single owner of every vertex, half-edge and face.
//! Relations between elements (`next`, `prev`, `rev`, `face`) are stored as
//! generational keys into the arena instead of pointers, so a face splice can
//! rewire edges that belong to different faces without fighting ownership,
//! and a stale key left behind by a removal is detected on lookup.
//!
//! ## Invariants
//!
//! For every half-edge `e` of a well-formed mesh set:
//!
//! - `edges[e.next].prev == e` and `edges[e.prev].next == e`
//! - walking `next` from `faces[f].edge` visits exactly `faces[f].n_edges`
//!   edges, all with `face == f`, and returns to the start
//! - if `e.rev` is set and `edges[e.rev].rev == e`, the pair is closed;
//!   otherwise `e` is an open (boundary) edge
//!
//! The validator checks these; surgery operations preserve them.

use nalgebra::{Point3, Vector3};
use slotmap::SlotMap;

use crate::keys::*;

/// Data stored for a vertex: a point in 3D space.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub position: Point3<f64>,
}

/// A directed edge owned by exactly one face.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    /// Start vertex. The end vertex is the start vertex of `next`.
    pub vert: VertexKey,
    /// Next edge around the same face.
    pub next: EdgeKey,
    /// Previous edge around the same face.
    pub prev: EdgeKey,
    /// Reverse partner on the neighbouring face, if any.
    pub rev: Option<EdgeKey>,
    /// Owning face.
    pub face: FaceKey,
}

/// Oriented plane `normal · p + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub d: f64,
}

impl Plane {
    /// Creates the plane through `point` with the given unit normal.
    pub fn from_point_normal(point: &Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// Signed distance of a point to the plane.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.d
    }
}

/// Data stored for a face: an anchor edge into its edge cycle.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// Anchor edge; the cycle is reached by walking `next`.
    pub edge: EdgeKey,
    /// Cached edge count of the cycle.
    pub n_edges: usize,
    /// Cached plane, cleared whenever surgery touches the face.
    pub plane: Option<Plane>,
}

/// A connected component of faces.
#[derive(Debug, Clone, Default)]
pub struct Shell {
    pub faces: Vec<FaceKey>,
}

impl Shell {
    /// Number of faces in the shell.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Owning collection of shells and the vertices, half-edges and faces they use.
///
/// # Example
///
/// ```
/// use ifc_mend_topology::MeshSet;
/// use nalgebra::Point3;
///
/// let points = [
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = MeshSet::from_polygons(&points, &[[0usize, 1, 2]]).unwrap();
///
/// assert_eq!(mesh.face_count(), 1);
/// assert_eq!(mesh.edge_count(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MeshSet {
    pub(crate) vertices: SlotMap<VertexKey, VertexData>,
    pub(crate) edges: SlotMap<EdgeKey, HalfEdge>,
    pub(crate) faces: SlotMap<FaceKey, FaceData>,
    pub(crate) shells: Vec<Shell>,
}

impl MeshSet {
    /// Creates an empty mesh set.
    pub fn new() -> Self {
        Self {
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            shells: Vec::new(),
        }
    }

    // --- Vertex access ---

    /// Adds a vertex at the given position.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexKey {
        self.vertices.insert(VertexData { position })
    }

    pub fn vertex(&self, key: VertexKey) -> Option<&VertexData> {
        self.vertices.get(key)
    }

    /// Returns the position of a vertex.
    pub fn vertex_position(&self, key: VertexKey) -> Option<Point3<f64>> {
        self.vertices.get(key).map(|v| v.position)
    }

    /// Number of vertices in storage, including unreferenced ones.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex_keys(&self) -> impl Iterator<Item = VertexKey> + '_ {
        self.vertices.keys()
    }

    // --- Edge access ---

    pub fn edge(&self, key: EdgeKey) -> Option<&HalfEdge> {
        self.edges.get(key)
    }

    /// Number of half-edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges.keys()
    }

    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    // --- Face access ---

    pub fn face(&self, key: FaceKey) -> Option<&FaceData> {
        self.faces.get(key)
    }

    /// Number of faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face_keys(&self) -> impl Iterator<Item = FaceKey> + '_ {
        self.faces.keys()
    }

    pub fn contains_face(&self, key: FaceKey) -> bool {
        self.faces.contains_key(key)
    }

    // --- Shell access ---

    pub fn shells(&self) -> &[Shell] {
        &self.shells
    }

    pub fn shell_count(&self) -> usize {
        self.shells.len()
    }

    /// Returns `true` if the mesh set holds no faces.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Drops cached planes of all faces.
    pub fn invalidate_planes(&mut self) {
        for face in self.faces.values_mut() {
            face.plane = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mesh_set_is_empty() {
        let mesh = MeshSet::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.edge_count(), 0);
        assert_eq!(mesh.face_count(), 0);
        assert_eq!(mesh.shell_count(), 0);
    }

    #[test]
    fn add_and_retrieve_vertex() {
        let mut mesh = MeshSet::new();
        let key = mesh.add_vertex(Point3::new(1.0, 2.0, 3.0));

        assert_eq!(mesh.vertex_position(key), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(mesh.vertex_count(), 1);
    }

    #[test]
    fn plane_signed_distance() {
        let plane = Plane::from_point_normal(&Point3::new(0.0, 0.0, 2.0), Vector3::z());
        assert_eq!(plane.signed_distance(&Point3::new(5.0, -1.0, 3.0)), 1.0);
        assert_eq!(plane.signed_distance(&Point3::new(0.0, 0.0, 0.0)), -2.0);
    }

    #[test]
    fn default_creates_empty() {
        let mesh = MeshSet::default();
        assert_eq!(mesh.face_count(), 0);
    }
}
