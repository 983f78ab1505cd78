// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OBJ-style text dumps of mesh sets for visual diffing.
//!
//! The simplifier only emits these when the `debug_geometry` feature is on.

use std::fmt::Write;

use ifc_mend_topology::{MeshSet, VertexKey};
use rustc_hash::FxHashMap;

/// Writes every referenced vertex and face as Wavefront OBJ text.
///
/// Each shell becomes its own `o` group; open edges are listed as `l`
/// lines so they stand out in a viewer.
pub fn mesh_set_to_obj(mesh: &MeshSet, name: &str) -> String {
    let mut out = String::new();
    let mut index: FxHashMap<VertexKey, usize> = FxHashMap::default();

    let _ = writeln!(out, "# {}", name);
    for vk in mesh.vertex_keys() {
        if let Some(p) = mesh.vertex_position(vk) {
            index.insert(vk, index.len() + 1);
            let _ = writeln!(out, "v {} {} {}", p.x, p.y, p.z);
        }
    }

    for (i, shell) in mesh.shells().iter().enumerate() {
        let _ = writeln!(out, "o shell_{}", i);
        for &fk in &shell.faces {
            let ids: Vec<String> = mesh
                .face_vertices(fk)
                .iter()
                .filter_map(|vk| index.get(vk))
                .map(|i| i.to_string())
                .collect();
            let _ = writeln!(out, "f {}", ids.join(" "));
        }
    }

    for ek in mesh.edge_keys() {
        if mesh.paired_rev(ek).is_some() {
            continue;
        }
        let (Some(start), Some(end)) = (mesh.edge(ek).map(|e| e.vert), mesh.edge_end(ek)) else {
            continue;
        };
        if let (Some(a), Some(b)) = (index.get(&start), index.get(&end)) {
            let _ = writeln!(out, "l {} {}", a, b);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn open_triangle_dump() {
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh = MeshSet::from_polygons(&points, &[[0usize, 1, 2]]).unwrap();
        let obj = mesh_set_to_obj(&mesh, "triangle");

        assert!(obj.starts_with("# triangle\n"));
        assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 3);
        assert!(obj.contains("f 1 2 3"));
        assert_eq!(obj.lines().filter(|l| l.starts_with("l ")).count(), 3);
    }
}
