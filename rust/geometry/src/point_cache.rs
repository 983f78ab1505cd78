// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerance-aware point deduplication and mesh rebuilding.
//!
//! [`PointMergeCache`] maps coordinates to point indices through three nested
//! ordered maps (x, then y, then z). A hash keyed on exact coordinates cannot
//! find "close enough" points; the ordered levels answer the per-axis range
//! query directly.
//!
//! [`PolyInputCache3D`] collects faces over a merged point list and turns
//! them into a fresh [`MeshSet`], rejecting degenerate triangles on the way in.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;

use ifc_mend_topology::{newell_vector, GeomProcessingParams, MeshSet};
use nalgebra::Point3;
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// `f64` with a total order, usable as a `BTreeMap` key.
#[derive(Debug, Clone, Copy)]
pub struct OrdF64(pub f64);

impl PartialEq for OrdF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrdF64 {}

impl PartialOrd for OrdF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type ZLevel = BTreeMap<OrdF64, usize>;
type YLevel = BTreeMap<OrdF64, ZLevel>;

/// Keys of `level` within `eps` of `value`, nearest first.
fn candidates<V>(level: &BTreeMap<OrdF64, V>, value: f64, eps: f64) -> SmallVec<[(f64, &V); 4]> {
    let range = (
        Bound::Included(OrdF64(value - eps)),
        Bound::Included(OrdF64(value + eps)),
    );
    let mut found: SmallVec<[(f64, &V); 4]> = level
        .range(range)
        .map(|(key, next)| ((key.0 - value).abs(), next))
        .collect();
    found.sort_by(|a, b| a.0.total_cmp(&b.0));
    found
}

/// Three-level ordered map from coordinates to point indices.
#[derive(Debug, Clone)]
pub struct PointMergeCache {
    eps: f64,
    map: BTreeMap<OrdF64, YLevel>,
    points: Vec<Point3<f64>>,
}

impl PointMergeCache {
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            map: BTreeMap::new(),
            points: Vec::new(),
        }
    }

    /// Finds a stored point within `eps` of `p` on every axis.
    pub fn find(&self, p: &Point3<f64>) -> Option<usize> {
        for (_, ys) in candidates(&self.map, p.x, self.eps) {
            for (_, zs) in candidates(ys, p.y, self.eps) {
                if let Some((_, &index)) = candidates(zs, p.z, self.eps).first() {
                    return Some(index);
                }
            }
        }
        None
    }

    /// Returns the index of an existing point within `eps` of `p`, or stores
    /// `p` and returns its new index.
    pub fn add_point(&mut self, p: Point3<f64>) -> usize {
        if let Some(index) = self.find(&p) {
            return index;
        }
        let index = self.points.len();
        self.points.push(p);
        self.map
            .entry(OrdF64(p.x))
            .or_default()
            .entry(OrdF64(p.y))
            .or_default()
            .insert(OrdF64(p.z), index);
        index
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.points.clear();
    }
}

/// Builder for a fresh mesh set from deduplicated points and face lists.
#[derive(Debug, Clone)]
pub struct PolyInputCache3D {
    eps: f64,
    cache: PointMergeCache,
    polygons: Vec<SmallVec<[usize; 4]>>,
}

impl PolyInputCache3D {
    pub fn new(eps: f64) -> Self {
        Self {
            eps,
            cache: PointMergeCache::new(eps),
            polygons: Vec::new(),
        }
    }

    pub fn from_params(params: &GeomProcessingParams) -> Self {
        Self::new(params.eps_merge_points)
    }

    /// Adds a point through the merge cache and returns its index.
    #[inline]
    pub fn add_point(&mut self, p: Point3<f64>) -> usize {
        self.cache.add_point(p)
    }

    /// Number of distinct points.
    pub fn num_points(&self) -> usize {
        self.cache.len()
    }

    /// Number of stored faces.
    pub fn num_faces(&self) -> usize {
        self.polygons.len()
    }

    fn is_valid_triangle(&self, a: usize, b: usize, c: usize) -> bool {
        if a == b || b == c || c == a {
            return false;
        }
        let points = self.cache.points();
        let (Some(pa), Some(pb), Some(pc)) = (points.get(a), points.get(b), points.get(c)) else {
            return false;
        };
        let min_len2 = self.eps * self.eps * 10.0;
        (pb - pa).norm_squared() > min_len2
            && (pc - pb).norm_squared() > min_len2
            && (pa - pc).norm_squared() > min_len2
    }

    /// Adds a triangle, or a quad split into `(a, b, c)` and `(a, c, d)`.
    ///
    /// Each triangle is kept only if its indices are pairwise distinct and
    /// every edge is longer than `sqrt(10) * eps`. Returns the number of
    /// triangles added.
    pub fn add_face_check_indexes(&mut self, indices: &[usize]) -> usize {
        let triangles: SmallVec<[[usize; 3]; 2]> = match *indices {
            [a, b, c] => smallvec::smallvec![[a, b, c]],
            [a, b, c, d] => smallvec::smallvec![[a, b, c], [a, c, d]],
            _ => return 0,
        };

        let mut added = 0;
        for [a, b, c] in triangles {
            if self.is_valid_triangle(a, b, c) {
                self.polygons.push(smallvec::smallvec![a, b, c]);
                added += 1;
            }
        }
        added
    }

    /// Adds a polygon of arbitrary size.
    ///
    /// Points are merged through the cache, consecutive duplicates removed
    /// (including across the closing edge), and the face dropped if fewer
    /// than three points remain or its area is below `eps²`.
    pub fn add_polygon(&mut self, points: &[Point3<f64>]) -> bool {
        let mut indices: SmallVec<[usize; 4]> = SmallVec::with_capacity(points.len());
        for &p in points {
            let index = self.add_point(p);
            if indices.last() != Some(&index) {
                indices.push(index);
            }
        }
        while indices.len() > 1 && indices.first() == indices.last() {
            indices.pop();
        }
        if indices.len() < 3 {
            return false;
        }

        let merged: SmallVec<[Point3<f64>; 4]> = indices
            .iter()
            .map(|&i| self.cache.points()[i])
            .collect();
        if newell_vector(&merged).norm() * 0.5 < self.eps * self.eps {
            return false;
        }

        self.polygons.push(indices);
        true
    }

    /// Builds a mesh set from the collected faces.
    pub fn build_mesh_set(&self) -> Result<MeshSet> {
        if self.polygons.is_empty() {
            return Err(Error::EmptyMesh("no faces survived the rebuild".to_string()));
        }
        let mut mesh = MeshSet::from_polygons(self.cache.points(), &self.polygons)?;
        mesh.remove_unreferenced_vertices();
        Ok(mesh)
    }
}
