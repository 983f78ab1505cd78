// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on half-edge faces and shells.
//!
//! Normals use Newell's method, which is robust for non-convex and slightly
//! non-planar polygons; its vector length is twice the polygon area, which
//! is how face areas are computed. Volumes sum signed tetrahedra against the
//! origin and are only meaningful for closed shells.

use nalgebra::{Point3, Vector3};

use crate::arena::{MeshSet, Plane};
use crate::keys::*;

/// Newell's vector of a polygon: normal direction, length = 2 × area.
pub fn newell_vector(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut normal = Vector3::new(0.0, 0.0, 0.0);
    let n = points.len();

    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }

    normal
}

/// Signed volume contribution of a polygon (fan triangulation against the origin).
fn polygon_signed_volume(points: &[Point3<f64>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let p0 = points[0].coords;
    let mut volume = 0.0;
    for i in 1..points.len() - 1 {
        let p1 = points[i].coords;
        let p2 = points[i + 1].coords;
        volume += p0.dot(&p1.cross(&p2));
    }
    volume / 6.0
}

/// Signed solid angle of triangle `abc` seen from `p` (Van Oosterom and
/// Strackee).
fn triangle_solid_angle(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let (a, b, c) = (a - p, b - p, c - p);
    let (la, lb, lc) = (a.norm(), b.norm(), c.norm());
    let numerator = a.dot(&b.cross(&c));
    let denominator = la * lb * lc + a.dot(&b) * lc + a.dot(&c) * lb + b.dot(&c) * la;
    2.0 * numerator.atan2(denominator)
}

impl MeshSet {
    /// Computes the unit normal of a face, or `None` for a zero-area face.
    pub fn face_normal(&self, face: FaceKey) -> Option<Vector3<f64>> {
        let newell = newell_vector(&self.face_points(face));
        let len = newell.norm();
        if len < 1e-15 {
            return None;
        }
        Some(newell / len)
    }

    /// Computes the area of a face.
    pub fn face_area(&self, face: FaceKey) -> f64 {
        newell_vector(&self.face_points(face)).norm() * 0.5
    }

    /// Returns the plane of a face, using the cached value when present.
    pub fn face_plane(&self, face: FaceKey) -> Option<Plane> {
        if let Some(plane) = self.faces.get(face)?.plane {
            return Some(plane);
        }
        self.compute_face_plane(face)
    }

    fn compute_face_plane(&self, face: FaceKey) -> Option<Plane> {
        let points = self.face_points(face);
        let newell = newell_vector(&points);
        let len = newell.norm();
        if len < 1e-15 {
            return None;
        }
        let centroid = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;
        Some(Plane::from_point_normal(
            &Point3::from(centroid),
            newell / len,
        ))
    }

    /// Recomputes and caches the plane of one face.
    pub fn recalc_face_plane(&mut self, face: FaceKey) -> Option<Plane> {
        let plane = self.compute_face_plane(face);
        if let Some(data) = self.faces.get_mut(face) {
            data.plane = plane;
        }
        plane
    }

    /// Recomputes and caches the planes of all faces.
    pub fn recalc_planes(&mut self) {
        let keys: Vec<FaceKey> = self.faces.keys().collect();
        for fk in keys {
            self.recalc_face_plane(fk);
        }
    }

    /// Squared length of an edge.
    pub fn edge_length2(&self, edge: EdgeKey) -> Option<f64> {
        let (start, end) = self.edge_points(edge)?;
        Some((end - start).norm_squared())
    }

    /// Signed volume enclosed by all faces of the mesh set.
    pub fn volume(&self) -> f64 {
        self.faces
            .keys()
            .map(|fk| polygon_signed_volume(&self.face_points(fk)))
            .sum()
    }

    /// Signed volume enclosed by the faces of one shell.
    pub fn shell_volume(&self, shell: usize) -> f64 {
        self.shells
            .get(shell)
            .map(|s| {
                s.faces
                    .iter()
                    .map(|&fk| polygon_signed_volume(&self.face_points(fk)))
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Generalized winding number of a shell around `point`.
    ///
    /// Close to ±1 inside a closed shell and to 0 outside, the sign
    /// following the shell's orientation.
    pub fn shell_winding_number(&self, shell: usize, point: &Point3<f64>) -> f64 {
        let Some(shell) = self.shells.get(shell) else {
            return 0.0;
        };
        let mut solid_angle = 0.0;
        for &fk in &shell.faces {
            let points = self.face_points(fk);
            for i in 1..points.len().saturating_sub(1) {
                solid_angle += triangle_solid_angle(point, &points[0], &points[i], &points[i + 1]);
            }
        }
        solid_angle / (4.0 * std::f64::consts::PI)
    }

    /// Sum of all face areas.
    pub fn surface_area(&self) -> f64 {
        self.faces.keys().map(|fk| self.face_area(fk)).sum()
    }

    /// Sum of the lengths of all open (unpaired) edges.
    pub fn open_boundary_length(&self) -> f64 {
        self.edges
            .iter()
            .filter(|(_, e)| e.rev.is_none())
            .filter_map(|(ek, _)| self.edge_length2(ek))
            .map(f64::sqrt)
            .sum()
    }

    /// Axis-aligned bounds of all referenced vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self
            .edges
            .values()
            .filter_map(|e| self.vertex_position(e.vert));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }
}
