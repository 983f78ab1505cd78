// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the conversion driver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Conversion cancelled")]
    Cancelled,

    #[error("Parse error: {0}")]
    Parse(#[from] ifc_mend_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] ifc_mend_geometry::Error),

    #[error("Topology error: {0}")]
    Topology(#[from] ifc_mend_topology::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
