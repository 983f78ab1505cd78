// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HEADER section: file description, file name and schema identifiers.

use crate::error::{Error, Result};
use crate::parser::{find_entity_end, parse_record, Token};
use crate::text::decode_step_string;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepHeader {
    /// FILE_DESCRIPTION description strings
    pub description: Vec<String>,
    /// FILE_NAME name attribute
    pub name: Option<String>,
    /// FILE_NAME originating system
    pub originating_system: Option<String>,
    /// FILE_SCHEMA identifiers, e.g. `IFC4`
    pub schemas: Vec<String>,
}

impl StepHeader {
    /// First schema identifier, upper-cased
    pub fn schema_version(&self) -> Option<String> {
        self.schemas.first().map(|s| s.to_ascii_uppercase())
    }
}

fn string_of(token: &Token) -> Option<String> {
    match token {
        Token::String(s) => Some(decode_step_string(s)),
        _ => None,
    }
}

fn strings_of(token: &Token) -> Vec<String> {
    match token {
        Token::List(items) => items.iter().filter_map(string_of).collect(),
        other => string_of(other).into_iter().collect(),
    }
}

/// Parses the HEADER section. `FILE_SCHEMA` is mandatory.
pub fn parse_header(content: &str) -> Result<StepHeader> {
    let bytes = content.as_bytes();
    let start = memchr::memmem::find(bytes, b"HEADER;")
        .ok_or_else(|| Error::InvalidHeader("missing HEADER section".into()))?;

    let mut header = StepHeader::default();
    let mut saw_schema = false;
    let mut pos = start + "HEADER;".len();

    while let Some(end) = find_entity_end(bytes, pos) {
        let record = content[pos..end].trim();
        if record == "ENDSEC;" {
            break;
        }
        let (name, args) = parse_record(record).map_err(|e| match e {
            Error::Parse { position, message } => Error::Parse {
                position: pos + position,
                message,
            },
            other => other,
        })?;

        match name.to_ascii_uppercase().as_str() {
            "FILE_DESCRIPTION" => {
                header.description = args.first().map(strings_of).unwrap_or_default();
            }
            "FILE_NAME" => {
                header.name = args.first().and_then(string_of);
                header.originating_system = args.get(5).and_then(string_of);
            }
            "FILE_SCHEMA" => {
                header.schemas = args.first().map(strings_of).unwrap_or_default();
                saw_schema = true;
            }
            other => tracing::debug!(record = other, "skipping header record"),
        }
        pos = end;
    }

    if !saw_schema {
        return Err(Error::InvalidHeader("missing FILE_SCHEMA".into()));
    }
    Ok(header)
}
