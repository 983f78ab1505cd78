// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry conversion driver.
//!
//! Parses a STEP file, collects one polygon soup per faceted brep and runs
//! each through mesh building, simplification and triangle export on a
//! rayon pool, with coarse cancellation and throttled progress.

pub mod brep;
pub mod config;
pub mod driver;
pub mod error;
pub mod progress;

pub use brep::{extract_faceted_breps, GeometryItem};
pub use config::Config;
pub use driver::{
    convert_items, convert_step, Conversion, ConversionReport, ConvertedMesh, ItemReport,
};
pub use error::{Error, Result};
pub use progress::{EntityMessage, MessageLog, ProgressCallback, ProgressReporter};
