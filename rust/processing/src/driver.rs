// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parallel geometry conversion.
//!
//! Each item is handled start to finish by one worker: point merging, mesh
//! build, simplification, orientation and triangle export. Workers share
//! only the cancellation flag, the progress reporter and the message log.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ifc_mend_core::{parse_header, EntityGraph};
use ifc_mend_geometry::{Mesh, MeshSimplifier, PolyInputCache3D, SimplifyOutcome};
use ifc_mend_topology::{check_mesh_set_valid_and_closed, Diagnostic, GeomProcessingParams};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::brep::{extract_faceted_breps, GeometryItem};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::{EntityMessage, MessageLog, ProgressReporter};

/// Per-item outcome in the conversion report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub entity_id: u32,
    pub faces_before: usize,
    pub faces_after: usize,
    pub open_edges_before: usize,
    pub open_edges_after: usize,
    /// Closed and free of disallowed defects after conversion.
    pub valid: bool,
    /// Whether the simplifier's result replaced the built mesh.
    pub simplified: bool,
    /// Simplification stages whose output was kept.
    pub stages: Vec<String>,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

/// Summary of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub schema_version: Option<String>,
    pub entity_count: usize,
    pub items: Vec<ItemReport>,
    pub messages: Vec<EntityMessage>,
    pub total_vertices: usize,
    pub total_triangles: usize,
    pub time_ms: u64,
}

impl ConversionReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A converted item's triangle buffers.
#[derive(Debug, Clone)]
pub struct ConvertedMesh {
    pub entity_id: u32,
    pub mesh: Mesh,
}

/// Output of a conversion run.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub meshes: Vec<ConvertedMesh>,
    pub report: ConversionReport,
}

/// Parameters whose diagnostics land in `log` under `entity_id`.
fn item_params(base: &GeomProcessingParams, entity_id: u32, log: &Arc<MessageLog>) -> GeomProcessingParams {
    let log = Arc::clone(log);
    base.clone().with_debug_callback(move |diagnostic| match diagnostic {
        Diagnostic::MeshDump { stage, dump } => {
            tracing::trace!(entity = entity_id, stage = *stage, "{}", dump);
        }
        Diagnostic::StageRejected { .. } => {
            tracing::debug!(entity = entity_id, %diagnostic, "stage rejected");
        }
        // Logged by the caller, and only for meshes that stay invalid
        Diagnostic::NoImprovement { .. } => {}
        other => {
            log.push(entity_id, other.to_string());
        }
    })
}

fn convert_item(
    item: &GeometryItem,
    base: &GeomProcessingParams,
    log: &Arc<MessageLog>,
) -> Option<(ConvertedMesh, ItemReport)> {
    let id = item.entity_id;
    let params = item_params(base, id, log);

    if item.skipped_faces > 0 {
        log.push(id, format!("{} unreadable faces skipped", item.skipped_faces));
    }
    if item.ignored_holes > 0 {
        log.push(id, format!("{} inner face bounds ignored", item.ignored_holes));
    }

    let mut cache = PolyInputCache3D::from_params(&params);
    let rejected = item
        .polygons
        .iter()
        .filter(|polygon| !cache.add_polygon(polygon))
        .count();
    if rejected > 0 {
        log.push(id, format!("{} degenerate polygons dropped", rejected));
    }

    let built = match cache.build_mesh_set() {
        Ok(mesh) => mesh,
        Err(err) => {
            log.push(id, err.to_string());
            return None;
        }
    };
    let before = check_mesh_set_valid_and_closed(&built, &params);

    let (mut mesh, info, stages) = match MeshSimplifier::new(params.clone()).simplify(&built) {
        Ok(simplified) => (simplified.mesh, simplified.info, simplified.stages),
        Err(outcome) => {
            tracing::debug!(entity = id, %outcome, "keeping built mesh");
            if outcome == SimplifyOutcome::NoImprovement && !before.mesh_set_valid {
                let diagnostic = Diagnostic::NoImprovement {
                    details: before.details.clone(),
                };
                log.push(id, diagnostic.to_string());
            }
            (built, before.clone(), Vec::new())
        }
    };
    if info.all_pointers_valid {
        mesh.orient_closed_shells_outward();
    }
    if !info.mesh_set_valid {
        log.push(id, format!("mesh is not valid for boolean operations: {}", info.details));
    }

    let exported = match Mesh::from_mesh_set(&mesh) {
        Ok(exported) => exported,
        Err(err) => {
            log.push(id, err.to_string());
            return None;
        }
    };

    let report = ItemReport {
        entity_id: id,
        faces_before: before.num_faces,
        faces_after: info.num_faces,
        open_edges_before: before.num_open_edges(),
        open_edges_after: info.num_open_edges(),
        valid: info.mesh_set_valid,
        simplified: !stages.is_empty(),
        stages: stages.iter().map(|s| s.name().to_string()).collect(),
        vertex_count: exported.vertex_count(),
        triangle_count: exported.triangle_count(),
    };
    Some((
        ConvertedMesh {
            entity_id: id,
            mesh: exported,
        },
        report,
    ))
}

/// Converts independent items on a pool of `config.worker_threads` threads.
///
/// `cancel` is checked once per item; once set, remaining items are skipped
/// and the run ends with [`Error::Cancelled`]. Items that fail to build are
/// left out and explained in the report's messages.
pub fn convert_items(
    items: &[GeometryItem],
    config: &Config,
    cancel: &AtomicBool,
    progress: Option<&ProgressReporter>,
) -> Result<Conversion> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build()?;
    let params = config.geom_params();
    let log = Arc::new(MessageLog::new());
    let done = AtomicUsize::new(0);
    let total = items.len();

    tracing::info!(items = total, threads = config.worker_threads, "starting geometry conversion");

    let converted: Vec<(ConvertedMesh, ItemReport)> = pool.install(|| {
        items
            .par_iter()
            .filter_map(|item| {
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let result = convert_item(item, &params, &log);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(progress) = progress {
                    progress.report(finished, total);
                }
                result
            })
            .collect()
    });

    if cancel.load(Ordering::Relaxed) {
        tracing::info!(
            finished = done.load(Ordering::Relaxed),
            items = total,
            "geometry conversion cancelled"
        );
        return Err(Error::Cancelled);
    }

    let (meshes, items): (Vec<ConvertedMesh>, Vec<ItemReport>) = converted.into_iter().unzip();
    let report = ConversionReport {
        total_vertices: items.iter().map(|i| i.vertex_count).sum(),
        total_triangles: items.iter().map(|i| i.triangle_count).sum(),
        items,
        messages: log.messages(),
        time_ms: start.elapsed().as_millis() as u64,
        ..ConversionReport::default()
    };

    tracing::info!(
        meshes = meshes.len(),
        vertices = report.total_vertices,
        triangles = report.total_triangles,
        messages = report.messages.len(),
        time_ms = report.time_ms,
        "geometry conversion complete"
    );
    Ok(Conversion { meshes, report })
}

/// Parses a STEP file and converts every faceted brep in it.
pub fn convert_step(
    content: &str,
    config: &Config,
    cancel: &AtomicBool,
    progress: Option<&ProgressReporter>,
) -> Result<Conversion> {
    let parse_start = Instant::now();
    let schema_version = match parse_header(content) {
        Ok(header) => header.schema_version(),
        Err(err) => {
            tracing::warn!(error = %err, "unreadable STEP header");
            None
        }
    };
    let graph = EntityGraph::parse(content)?;
    let items = extract_faceted_breps(&graph);
    tracing::info!(
        entities = graph.len(),
        breps = items.len(),
        parse_time_ms = parse_start.elapsed().as_millis() as u64,
        "parse phase complete"
    );

    let mut conversion = convert_items(&items, config, cancel, progress)?;
    conversion.report.schema_version = schema_version;
    conversion.report.entity_count = graph.len();
    conversion.report.time_ms = parse_start.elapsed().as_millis() as u64;
    Ok(conversion)
}
