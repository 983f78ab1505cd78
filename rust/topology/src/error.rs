// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for half-edge mesh operations.
//!
//! Geometric defects (open edges, zero-area faces, fins) are never errors;
//! they are reported through [`MeshSetInfo`](crate::MeshSetInfo). The variants
//! here describe structural problems that make further traversal unsafe.

use crate::keys::{EdgeKey, FaceKey, VertexKey};

/// Result type alias for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during topology operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vertex key not found in the arena.
    #[error("vertex not found: {0:?}")]
    VertexNotFound(VertexKey),

    /// Edge key not found in the arena.
    #[error("edge not found: {0:?}")]
    EdgeNotFound(EdgeKey),

    /// Face key not found in the arena.
    #[error("face not found: {0:?}")]
    FaceNotFound(FaceKey),

    /// A polygon referenced a point index outside the point list.
    #[error("vertex index {index} out of range ({count} points)")]
    InvalidVertexIndex { index: usize, count: usize },

    /// A face needs at least 3 edges.
    #[error("face has fewer than 3 distinct vertices")]
    DegenerateFace,

    /// A face splice would exceed the configured edge bound. This cannot be
    /// told apart from a runaway traversal, so it is never retried.
    #[error("face {face:?} would have {count} edges, maximum is {max}")]
    FaceEdgeLimitExceeded {
        face: FaceKey,
        count: usize,
        max: usize,
    },

    /// The next/prev/rev/face links are inconsistent.
    #[error("corrupt half-edge structure: {0}")]
    CorruptTopology(String),
}

impl Error {
    /// Returns `true` for errors that signal a corrupted pointer graph rather
    /// than a rejected input.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::FaceEdgeLimitExceeded { .. } | Error::CorruptTopology(_)
        )
    }
}
