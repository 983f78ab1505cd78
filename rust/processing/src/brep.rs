// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon soups from faceted boundary representations.
//!
//! Follows `IFCFACETEDBREP → IFCCLOSEDSHELL → IFCFACE → IFCFACE(OUTER)BOUND →
//! IFCPOLYLOOP → IFCCARTESIANPOINT`. Only outer bounds are read; faces with
//! inner bounds lose their holes and are counted.

use ifc_mend_core::{DecodedEntity, EntityGraph};
use ifc_mend_geometry::Point3;

/// One top-level object to convert: its entity id and raw polygons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryItem {
    pub entity_id: u32,
    pub polygons: Vec<Vec<Point3<f64>>>,
    /// Faces that could not be read (wrong types, short loops).
    pub skipped_faces: usize,
    /// Inner bounds that were ignored.
    pub ignored_holes: usize,
}

impl GeometryItem {
    pub fn new(entity_id: u32, polygons: Vec<Vec<Point3<f64>>>) -> Self {
        Self {
            entity_id,
            polygons,
            ..Self::default()
        }
    }
}

fn cartesian_point(graph: &EntityGraph, id: u32) -> Option<Point3<f64>> {
    let point = graph.get(id).filter(|e| e.is_type("IFCCARTESIANPOINT"))?;
    let coords = point.get_list(0)?;
    let x = coords.first()?.as_float()?;
    let y = coords.get(1)?.as_float()?;
    let z = coords.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);
    Some(Point3::new(x, y, z))
}

fn poly_loop(graph: &EntityGraph, id: u32) -> Option<Vec<Point3<f64>>> {
    let poly = graph.get(id).filter(|e| e.is_type("IFCPOLYLOOP"))?;
    let points = poly
        .get_ref_list(0)
        .into_iter()
        .map(|p| cartesian_point(graph, p))
        .collect::<Option<Vec<_>>>()?;
    (points.len() >= 3).then_some(points)
}

/// Outer loop of a face, in face orientation, plus the number of inner bounds.
fn face_outer_loop(graph: &EntityGraph, face: &DecodedEntity) -> Option<(Vec<Point3<f64>>, usize)> {
    let bounds: Vec<&DecodedEntity> = face
        .get_ref_list(0)
        .into_iter()
        .filter_map(|id| graph.get(id))
        .collect();

    // The first bound stands in for the outer one when none is marked
    let outer = bounds
        .iter()
        .position(|b| b.is_type("IFCFACEOUTERBOUND"))
        .unwrap_or(0);
    let bound = bounds.get(outer)?;

    let mut points = poly_loop(graph, bound.get_ref(0)?)?;
    if bound.get(1).and_then(|v| v.as_bool()) == Some(false) {
        points.reverse();
    }
    Some((points, bounds.len() - 1))
}

fn shell_faces(graph: &EntityGraph, shell_id: u32, item: &mut GeometryItem) {
    let Some(shell) = graph.get(shell_id) else {
        return;
    };
    for face_id in shell.get_ref_list(0) {
        match graph
            .get(face_id)
            .filter(|f| f.is_type("IFCFACE"))
            .and_then(|f| face_outer_loop(graph, f))
        {
            Some((points, holes)) => {
                item.polygons.push(points);
                item.ignored_holes += holes;
            }
            None => item.skipped_faces += 1,
        }
    }
}

/// Extracts one item per `IFCFACETEDBREP`, ascending by id.
pub fn extract_faceted_breps(graph: &EntityGraph) -> Vec<GeometryItem> {
    graph
        .of_type("IFCFACETEDBREP")
        .into_iter()
        .filter_map(|brep| {
            let mut item = GeometryItem::new(brep.id, Vec::new());
            shell_faces(graph, brep.get_ref(0)?, &mut item);
            if item.skipped_faces > 0 || item.ignored_holes > 0 {
                tracing::debug!(
                    entity = brep.id,
                    skipped = item.skipped_faces,
                    holes = item.ignored_holes,
                    "incomplete faceted brep"
                );
            }
            Some(item)
        })
        .collect()
}
