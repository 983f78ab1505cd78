// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolved entity graph
//!
//! Second pass over the decoded instances: every `#id` must name a defined
//! instance, and each instance learns which instances point at it.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::decoder::parse_data_section;
use crate::entity::DecodedEntity;
use crate::error::{Error, Result};

/// Entities by id plus the inverse reference map.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: FxHashMap<u32, DecodedEntity>,
    inverse: FxHashMap<u32, SmallVec<[u32; 4]>>,
}

impl EntityGraph {
    /// Builds the graph, failing on duplicate ids or dangling references.
    pub fn resolve(decoded: Vec<DecodedEntity>) -> Result<Self> {
        let mut entities =
            FxHashMap::with_capacity_and_hasher(decoded.len(), Default::default());
        for entity in decoded {
            let id = entity.id;
            if entities.insert(id, entity).is_some() {
                return Err(Error::DuplicateEntity(id));
            }
        }

        let mut inverse: FxHashMap<u32, SmallVec<[u32; 4]>> = FxHashMap::default();
        for entity in entities.values() {
            for target in entity.refs() {
                if !entities.contains_key(&target) {
                    return Err(Error::UnresolvedReference {
                        from: entity.id,
                        to: target,
                    });
                }
                let sources = inverse.entry(target).or_default();
                if !sources.contains(&entity.id) {
                    sources.push(entity.id);
                }
            }
        }
        for sources in inverse.values_mut() {
            sources.sort_unstable();
        }

        tracing::debug!(
            entities = entities.len(),
            referenced = inverse.len(),
            "resolved entity graph"
        );
        Ok(Self { entities, inverse })
    }

    /// Decodes the data section of `content` and resolves it.
    pub fn parse(content: &str) -> Result<Self> {
        Self::resolve(parse_data_section(content)?)
    }

    pub fn get(&self, id: u32) -> Option<&DecodedEntity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids of the instances referencing `id`, ascending.
    pub fn inverse_refs(&self, id: u32) -> &[u32] {
        self.inverse.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Instances of one type, ascending by id.
    pub fn of_type(&self, type_name: &str) -> Vec<&DecodedEntity> {
        let mut found: Vec<&DecodedEntity> = self
            .entities
            .values()
            .filter(|e| e.is_type(type_name))
            .collect();
        found.sort_unstable_by_key(|e| e.id);
        found
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecodedEntity> {
        self.entities.values()
    }
}
