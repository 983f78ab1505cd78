// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Mend Topology
//!
//! Half-edge mesh arena for repairing polygonal meshes produced by BRep
//! tessellation and boolean operations.
//!
//! Vertices, half-edges and faces live in slot maps keyed by generational
//! keys, so surgery that deletes elements invalidates stale keys instead of
//! leaving dangling pointers. On top of the arena this crate provides:
//!
//! - [`check_mesh_set_valid_and_closed`]: read-only defect report
//!   ([`MeshSetInfo`]) and the [`is_better_for_bool_op`] ranking
//! - surgery primitives on [`MeshSet`]: face splicing
//!   ([`MeshSet::remove_edge_and_merge_faces`]), colinear vertex removal
//!   ([`MeshSet::merge_aligned_edges`]) and orientation repair
//! - [`GeomProcessingParams`]: tolerances and flags threaded through every
//!   operation
//!
//! Nothing here holds global state; independent meshes can be processed on
//! separate threads.

pub mod arena;
pub mod construction;
pub mod error;
pub mod geometry;
pub mod keys;
pub mod params;
pub mod surgery;
pub mod traversal;
pub mod validate;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_meshes;

pub use arena::{FaceData, HalfEdge, MeshSet, Plane, Shell, VertexData};
pub use error::{Error, Result};
pub use geometry::newell_vector;
pub use keys::{EdgeKey, FaceKey, VertexKey};
pub use params::{
    DebugCallback, Diagnostic, GeomProcessingParams, DEFAULT_EPS_MERGE_ALIGNED_EDGES_ANGLE,
    DEFAULT_EPS_MERGE_POINTS, DEFAULT_MAX_NUM_FACE_EDGES,
};
pub use surgery::SharedRun;
pub use traversal::FaceEdges;
pub use validate::{check_mesh_set_valid_and_closed, is_better_for_bool_op, MeshSetInfo};
