// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Mend Geometry Processing
//!
//! Mesh repair on top of the `ifc-mend-topology` half-edge arena: tolerant
//! point merging, mesh rebuilding, the staged [`MeshSimplifier`], and
//! triangle-buffer export using earcutr triangulation.

pub mod dump;
pub mod error;
pub mod mesh;
pub mod point_cache;
pub mod retriangulate;
pub mod simplify;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use mesh::Mesh;
pub use point_cache::{PointMergeCache, PolyInputCache3D};
pub use retriangulate::retriangulate_mesh_set;
pub use simplify::{
    merge_aligned_edges_in_mesh_set, merge_coplanar_faces_in_mesh_set,
    remove_degenerate_faces_in_mesh_set, simplify_mesh_set, MeshSimplifier, SimplifiedMesh,
    SimplifyOutcome, Stage,
};
pub use triangulation::{triangulate_face, triangulate_polygon};
