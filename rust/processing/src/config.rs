// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver configuration loaded from environment variables.

use std::str::FromStr;

use ifc_mend_topology::{
    GeomProcessingParams, DEFAULT_EPS_MERGE_ALIGNED_EDGES_ANGLE, DEFAULT_EPS_MERGE_POINTS,
    DEFAULT_MAX_NUM_FACE_EDGES,
};

/// Default minimum progress delta between two progress events.
pub const DEFAULT_PROGRESS_STEP: f64 = 0.01;

/// Conversion driver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Number of worker threads for parallel conversion.
    pub worker_threads: usize,
    /// Point merge tolerance.
    pub eps_merge_points: f64,
    /// Direction tolerance for coplanar and collinear tests.
    pub eps_merge_angle: f64,
    /// Maximum edge count of a single face.
    pub max_face_edges: usize,
    /// Minimum progress delta (0..1) between two progress callbacks.
    pub progress_step: f64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    /// Unparsable or non-positive values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn read<T: FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }
        let defaults = Self::defaults();

        Self {
            worker_threads: read(lookup("IFC_MEND_WORKER_THREADS"))
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.worker_threads),
            eps_merge_points: read(lookup("IFC_MEND_EPS_MERGE_POINTS"))
                .filter(|&e: &f64| e > 0.0)
                .unwrap_or(defaults.eps_merge_points),
            eps_merge_angle: read(lookup("IFC_MEND_EPS_MERGE_ANGLE"))
                .filter(|&e: &f64| e > 0.0)
                .unwrap_or(defaults.eps_merge_angle),
            max_face_edges: read(lookup("IFC_MEND_MAX_FACE_EDGES"))
                .filter(|&n: &usize| n >= 3)
                .unwrap_or(defaults.max_face_edges),
            progress_step: read(lookup("IFC_MEND_PROGRESS_STEP"))
                .filter(|s: &f64| (0.0..=1.0).contains(s))
                .unwrap_or(defaults.progress_step),
        }
    }

    /// Built-in defaults, independent of the environment.
    pub fn defaults() -> Self {
        Self {
            worker_threads: env_or("RAYON_NUM_THREADS", num_cpus::get()).max(1),
            eps_merge_points: DEFAULT_EPS_MERGE_POINTS,
            eps_merge_angle: DEFAULT_EPS_MERGE_ALIGNED_EDGES_ANGLE,
            max_face_edges: DEFAULT_MAX_NUM_FACE_EDGES,
            progress_step: DEFAULT_PROGRESS_STEP,
        }
    }

    /// Mesh engine parameters for one conversion.
    pub fn geom_params(&self) -> GeomProcessingParams {
        GeomProcessingParams::new(self.eps_merge_points)
            .with_eps_merge_aligned_edges_angle(self.eps_merge_angle)
            .with_max_num_face_edges(self.max_face_edges)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
