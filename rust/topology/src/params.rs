// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Processing parameters threaded through every mesh operation.
//!
//! [`GeomProcessingParams`] is passed by reference and cloned whenever a stage
//! needs to override a flag locally, so siblings never observe each other's
//! overrides. Position tolerance and direction tolerance are separate values:
//! one is a length, the other is a deviation of a unit-vector dot product
//! from 1.0.

use std::fmt;
use std::sync::Arc;

/// Default tolerance for merging points (model units).
pub const DEFAULT_EPS_MERGE_POINTS: f64 = 1e-6;

/// Default tolerance for treating directions as parallel (1 - cos angle).
pub const DEFAULT_EPS_MERGE_ALIGNED_EDGES_ANGLE: f64 = 1e-6;

/// Default safety bound on the number of edges in a single face.
pub const DEFAULT_MAX_NUM_FACE_EDGES: usize = 10_000;

/// Message emitted by the mesh engine to the diagnostic callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A pipeline stage produced a candidate that ranked worse and was discarded.
    StageRejected { stage: &'static str, reason: String },
    /// An operation the engine does not fully trust (triangulation, splicing)
    /// failed; the stage is treated as "no improvement".
    KernelFailure { stage: &'static str, message: String },
    /// The pointer graph is corrupt; the input is passed through untouched.
    StructuralDefect { message: String },
    /// No stage improved the mesh.
    NoImprovement { details: String },
    /// Human-readable dump of an intermediate mesh state.
    MeshDump { stage: &'static str, dump: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::StageRejected { stage, reason } => {
                write!(f, "stage '{}' rejected: {}", stage, reason)
            }
            Diagnostic::KernelFailure { stage, message } => {
                write!(f, "stage '{}' failed: {}", stage, message)
            }
            Diagnostic::StructuralDefect { message } => {
                write!(f, "structural defect: {}", message)
            }
            Diagnostic::NoImprovement { details } => {
                write!(f, "shape could not be improved: {}", details)
            }
            Diagnostic::MeshDump { stage, dump } => {
                write!(f, "mesh dump after '{}' ({} bytes)", stage, dump.len())
            }
        }
    }
}

/// Diagnostic callback, shared between the clones of one parameter set.
pub type DebugCallback = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

/// Configuration for mesh validation, surgery and simplification.
#[derive(Clone)]
pub struct GeomProcessingParams {
    /// Distance below which two points are considered identical.
    pub eps_merge_points: f64,
    /// Maximum `1 - dot` between unit directions treated as parallel.
    pub eps_merge_aligned_edges_angle: f64,
    /// Upper bound on the edge count of one face; exceeding it is fatal.
    pub max_num_face_edges: usize,
    /// Accept meshes with fin edges as valid.
    pub allow_fin_edges: bool,
    /// Accept meshes with zero-area faces as valid.
    pub allow_zero_area_faces: bool,
    /// Triangulate the simplified mesh before handing it back.
    pub triangulate_result: bool,
    /// Optional diagnostic sink.
    pub debug_callback: Option<DebugCallback>,
}

impl GeomProcessingParams {
    /// Creates parameters with the given point tolerance and defaults elsewhere.
    pub fn new(eps_merge_points: f64) -> Self {
        Self {
            eps_merge_points,
            ..Self::default()
        }
    }

    pub fn with_eps_merge_points(mut self, eps: f64) -> Self {
        self.eps_merge_points = eps;
        self
    }

    pub fn with_eps_merge_aligned_edges_angle(mut self, eps: f64) -> Self {
        self.eps_merge_aligned_edges_angle = eps;
        self
    }

    pub fn with_max_num_face_edges(mut self, max: usize) -> Self {
        self.max_num_face_edges = max;
        self
    }

    pub fn with_allow_fin_edges(mut self, allow: bool) -> Self {
        self.allow_fin_edges = allow;
        self
    }

    pub fn with_allow_zero_area_faces(mut self, allow: bool) -> Self {
        self.allow_zero_area_faces = allow;
        self
    }

    pub fn with_triangulate_result(mut self, triangulate: bool) -> Self {
        self.triangulate_result = triangulate;
        self
    }

    /// Installs a diagnostic callback.
    pub fn with_debug_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Diagnostic) + Send + Sync + 'static,
    {
        self.debug_callback = Some(Arc::new(callback));
        self
    }

    /// Squared point tolerance.
    #[inline]
    pub fn eps_merge_points_sq(&self) -> f64 {
        self.eps_merge_points * self.eps_merge_points
    }

    /// Forwards a diagnostic to the callback, if one is installed.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if let Some(callback) = &self.debug_callback {
            callback(&diagnostic);
        }
    }
}

impl Default for GeomProcessingParams {
    fn default() -> Self {
        Self {
            eps_merge_points: DEFAULT_EPS_MERGE_POINTS,
            eps_merge_aligned_edges_angle: DEFAULT_EPS_MERGE_ALIGNED_EDGES_ANGLE,
            max_num_face_edges: DEFAULT_MAX_NUM_FACE_EDGES,
            allow_fin_edges: false,
            allow_zero_area_faces: false,
            triangulate_result: false,
            debug_callback: None,
        }
    }
}

impl fmt::Debug for GeomProcessingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeomProcessingParams")
            .field("eps_merge_points", &self.eps_merge_points)
            .field(
                "eps_merge_aligned_edges_angle",
                &self.eps_merge_aligned_edges_angle,
            )
            .field("max_num_face_edges", &self.max_num_face_edges)
            .field("allow_fin_edges", &self.allow_fin_edges)
            .field("allow_zero_area_faces", &self.allow_zero_area_faces)
            .field("triangulate_result", &self.triangulate_result)
            .field("debug_callback", &self.debug_callback.is_some())
            .finish()
    }
}
