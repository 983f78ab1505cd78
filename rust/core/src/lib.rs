// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Mend Core Parser
//!
//! STEP (ISO 10303-21) reader built with [nom](https://docs.rs/nom) that
//! feeds raw geometry into the mesh repair engine.
//!
//! - **Tokenization**: zero-copy nom grammar for instance arguments
//! - **Entity index**: memchr scan from `#id=` to the terminating `;`
//! - **Parallel decoding**: instances are parsed on the rayon pool
//! - **Resolution**: [`EntityGraph`] checks every reference and builds the
//!   inverse reference map
//!
//! ```rust,ignore
//! use ifc_mend_core::{parse_header, EntityGraph};
//!
//! let header = parse_header(content)?;
//! let graph = EntityGraph::parse(content)?;
//! for face in graph.of_type("IFCFACE") {
//!     println!("#{} has {} bounds", face.id, face.get_ref_list(0).len());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: serialization for decoded entities and the header

pub mod decoder;
pub mod entity;
pub mod error;
pub mod graph;
pub mod header;
pub mod parser;
pub mod text;

pub use decoder::{build_entity_index, decode_at, parse_data_section, EntityIndex};
pub use entity::{AttributeValue, DecodedEntity};
pub use error::{Error, Result};
pub use graph::EntityGraph;
pub use header::{parse_header, StepHeader};
pub use parser::{parse_entity, parse_record, EntityScanner, Token};
pub use text::decode_step_string;
