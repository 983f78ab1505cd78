// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for the half-edge arena.
//!
//! Keys are created by `slotmap::SlotMap` and carry a generation counter, so a
//! key that outlives the element it pointed at (an edge deleted by a face
//! splice, a face removed after a merge) is detected on lookup instead of
//! silently aliasing a newer element.

use slotmap::new_key_type;

new_key_type! {
    /// Key for a vertex (point in 3D space).
    pub struct VertexKey;

    /// Key for a half-edge (directed edge owned by exactly one face).
    pub struct EdgeKey;

    /// Key for a face (closed cycle of half-edges).
    pub struct FaceKey;
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn removed_key_is_stale() {
        let mut edges: SlotMap<EdgeKey, u32> = SlotMap::with_key();
        let old = edges.insert(1);
        edges.remove(old);
        let new = edges.insert(2);

        // Same slot, different generation
        assert_ne!(old, new);
        assert!(edges.get(old).is_none());
    }
}
