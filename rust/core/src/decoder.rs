// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity index and data-section decoding
//!
//! The index pass is a single sequential memchr scan. Instances are
//! independent once their byte ranges are known, so the decoding pass is a
//! parallel map over them.

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::entity::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::{data_section_start, find_entity_end, parse_entity};

/// Pre-built entity index type: entity id to byte range
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content - O(n) scan using SIMD-accelerated search
///
/// Fails on an id defined twice or one that does not fit in `u32`.
pub fn build_entity_index(content: &str) -> Result<EntityIndex> {
    let bytes = content.as_bytes();
    let len = bytes.len();

    // Roughly 1 entity per 50 bytes
    let mut index = FxHashMap::with_capacity_and_hasher(len / 50, Default::default());

    let mut pos = data_section_start(content);

    while pos < len {
        let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
            Some(offset) => offset,
            None => break,
        };

        let start = pos + hash_offset;
        pos = start + 1;

        let id_start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let id_end = pos;

        // Handles both `#45=` and `#45 = `
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if id_end > id_start && pos < len && bytes[pos] == b'=' {
            let id = parse_u32_inline(bytes, id_start, id_end)
                .ok_or_else(|| Error::parse(start, "entity id out of range"))?;

            let end = find_entity_end(bytes, pos)
                .ok_or_else(|| Error::parse(start, format!("entity #{} is not terminated", id)))?;
            if index.insert(id, (start, end)).is_some() {
                return Err(Error::DuplicateEntity(id));
            }
            pos = end;
        }
    }

    Ok(index)
}

/// u32 parsing without string allocation
#[inline]
fn parse_u32_inline(bytes: &[u8], start: usize, end: usize) -> Option<u32> {
    bytes[start..end].iter().try_fold(0u32, |acc, &byte| {
        acc.checked_mul(10)?.checked_add((byte - b'0') as u32)
    })
}

/// Decode the instance at a byte range. Parse errors report absolute offsets.
pub fn decode_at(content: &str, start: usize, end: usize) -> Result<DecodedEntity> {
    let line = &content[start..end];
    let (id, type_name, tokens) = parse_entity(line).map_err(|e| match e {
        Error::Parse { position, message } => Error::Parse {
            position: start + position,
            message: format!("{}: {:?}", message, excerpt(line, 100)),
        },
        other => other,
    })?;

    let attributes = tokens.iter().map(AttributeValue::from_token).collect();
    Ok(DecodedEntity::new(id, type_name, attributes))
}

/// First `max_chars` characters of `line`.
fn excerpt(line: &str, max_chars: usize) -> &str {
    line.char_indices()
        .nth(max_chars)
        .map_or(line, |(at, _)| &line[..at])
}

/// Decodes every instance of the data section, in file order.
///
/// Lines are parsed on the rayon pool; the first parse error aborts.
pub fn parse_data_section(content: &str) -> Result<Vec<DecodedEntity>> {
    let index = build_entity_index(content)?;

    let mut spans: Vec<(usize, usize)> = index.into_values().collect();
    spans.sort_unstable();

    let entities = spans
        .par_iter()
        .map(|&(start, end)| decode_at(content, start, end))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(entities = entities.len(), "decoded data section");
    Ok(entities)
}
