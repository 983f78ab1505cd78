// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Small hand-built meshes shared by the tests of the workspace.
//!
//! Compiled for this crate's own tests, and for dependents through the
//! `test-fixtures` feature.

use nalgebra::{Point3, Vector3};

use crate::arena::MeshSet;

pub fn cube_points() -> Vec<Point3<f64>> {
    box_points(Point3::origin(), 1.0)
}

/// Corners of an axis-aligned cube, bottom ring then top ring.
pub fn box_points(min: Point3<f64>, size: f64) -> Vec<Point3<f64>> {
    [
        (0.0, 0.0, 0.0),
        (1.0, 0.0, 0.0),
        (1.0, 1.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
        (1.0, 0.0, 1.0),
        (1.0, 1.0, 1.0),
        (0.0, 1.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| min + Vector3::new(x, y, z) * size)
    .collect()
}

/// Outward quads over [`box_points`], the bottom first.
const BOX_QUADS: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Box faces over points starting at `offset`, optionally facing inward
/// and optionally split into triangles.
fn box_faces(offset: usize, inward: bool, triangles: bool) -> Vec<Vec<usize>> {
    let mut faces = Vec::new();
    for quad in BOX_QUADS {
        let mut quad: Vec<usize> = quad.iter().map(|&i| i + offset).collect();
        if inward {
            quad.reverse();
        }
        if triangles {
            faces.push(vec![quad[0], quad[1], quad[2]]);
            faces.push(vec![quad[0], quad[2], quad[3]]);
        } else {
            faces.push(quad);
        }
    }
    faces
}

/// Solid 4x4x4 box with a unit cube cavity at (1, 1, 1). The outer shell
/// faces outward, the cavity shell faces into the void, the volume is 63.
pub fn hollow_box(triangles: bool) -> MeshSet {
    let mut points = box_points(Point3::origin(), 4.0);
    points.extend(box_points(Point3::new(1.0, 1.0, 1.0), 1.0));
    let mut faces = box_faces(0, false, triangles);
    faces.extend(box_faces(8, true, triangles));
    MeshSet::from_polygons(&points, &faces).unwrap()
}

/// Two disjoint outward unit cubes.
pub fn two_cubes() -> MeshSet {
    let mut points = cube_points();
    points.extend(box_points(Point3::new(3.0, 0.0, 0.0), 1.0));
    let mut faces = box_faces(0, false, false);
    faces.extend(box_faces(8, false, false));
    MeshSet::from_polygons(&points, &faces).unwrap()
}

/// Unit cube with outward-facing quads. The first face is the bottom.
pub fn unit_cube() -> MeshSet {
    MeshSet::from_polygons(&cube_points(), &BOX_QUADS).unwrap()
}

/// Unit cube with every quad split into two coplanar triangles.
pub fn triangulated_cube() -> MeshSet {
    MeshSet::from_polygons(&cube_points(), &box_faces(0, false, true)).unwrap()
}

/// Planar unit square tessellated into two triangles sharing the diagonal.
pub fn split_quad() -> MeshSet {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    MeshSet::from_polygons(&points, &[[0usize, 1, 2], [0, 2, 3]]).unwrap()
}

/// Unit cube with an extra vertex in the middle of the edge shared by the
/// top and front faces. The vertex has exactly two edges meeting there.
pub fn cube_with_midpoint() -> MeshSet {
    let mut points = cube_points();
    points.push(Point3::new(0.5, 0.0, 1.0));
    let faces: Vec<Vec<usize>> = vec![
        vec![0, 3, 2, 1],
        vec![4, 8, 5, 6, 7],
        vec![0, 1, 5, 8, 4],
        vec![1, 2, 6, 5],
        vec![2, 3, 7, 6],
        vec![3, 0, 4, 7],
    ];
    MeshSet::from_polygons(&points, &faces).unwrap()
}

/// Closed tetrahedron whose apex is duplicated into two coincident vertices
/// joined by a zero-length edge, with two zero-area slivers closing the gap.
pub fn tetra_with_split_apex() -> MeshSet {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.2, 0.2, 1.0),
        Point3::new(0.2, 0.2, 1.0),
    ];
    let faces = [
        [0usize, 2, 1],
        [0, 1, 3],
        [1, 2, 4],
        [2, 0, 3],
        [1, 4, 3],
        [2, 3, 4],
    ];
    MeshSet::from_polygons(&points, &faces).unwrap()
}

/// Two triangles glued back to back: closed, but every edge is a fin.
pub fn back_to_back_triangles() -> MeshSet {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    MeshSet::from_polygons(&points, &[[0usize, 1, 2], [0, 2, 1]]).unwrap()
}
