// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Staged mesh simplification with rollback.
//!
//! [`MeshSimplifier`] runs, in order: degenerate face removal, coplanar face
//! merging, aligned edge merging, and (only while the mesh is still invalid)
//! full retriangulation. Every stage works on a copy of the best mesh so
//! far; its result replaces that mesh only if the validator ranks it no
//! worse. The final result is returned only if it ranks strictly better than
//! the input, so callers never receive a mesh worse than what they passed in.
//!
//! Errors from stages are split in two. A corrupted half-edge graph (or a
//! face-edge overflow, which cannot be told apart from one) aborts with
//! [`SimplifyOutcome::StructuralDefect`]. Anything else, such as a failed
//! triangulation, only marks that stage as unproductive.

mod stages;

#[cfg(test)]
mod tests;

pub use stages::{
    merge_aligned_edges_in_mesh_set, merge_coplanar_faces_in_mesh_set,
    remove_degenerate_faces_in_mesh_set, MERGE_VOLUME_RATIO,
};

use ifc_mend_topology::{
    check_mesh_set_valid_and_closed, Diagnostic, GeomProcessingParams, MeshSet, MeshSetInfo,
};

use crate::error::Error;
use crate::retriangulate::{is_triangulated, retriangulate_mesh_set};

/// Pipeline stage identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    RemoveDegenerate,
    MergeCoplanar,
    MergeAligned,
    Retriangulate,
    Triangulate,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RemoveDegenerate => "remove degenerate faces",
            Stage::MergeCoplanar => "merge coplanar faces",
            Stage::MergeAligned => "merge aligned edges",
            Stage::Retriangulate => "retriangulate",
            Stage::Triangulate => "triangulate result",
        }
    }
}

/// Why the simplifier returned no mesh. The caller keeps its input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimplifyOutcome {
    /// No stage produced a mesh ranked strictly better than the input.
    #[error("no improvement")]
    NoImprovement,
    /// The half-edge graph is corrupt, in the input or after a stage.
    #[error("structural defect: {0}")]
    StructuralDefect(String),
}

/// An accepted simplification result.
#[derive(Debug, Clone)]
pub struct SimplifiedMesh {
    pub mesh: MeshSet,
    pub info: MeshSetInfo,
    /// Stages whose output was kept, in order.
    pub stages: Vec<Stage>,
}

/// Best mesh found so far, with its validation record.
struct Best {
    mesh: MeshSet,
    info: MeshSetInfo,
    stages: Vec<Stage>,
}

/// Orchestrates the simplification stages for one mesh at a time.
///
/// Holds no state between calls; one simplifier can serve many meshes and
/// independent simplifiers can run on separate threads.
#[derive(Debug, Clone, Default)]
pub struct MeshSimplifier {
    params: GeomProcessingParams,
}

impl MeshSimplifier {
    pub fn new(params: GeomProcessingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GeomProcessingParams {
        &self.params
    }

    fn validate(&self, mesh: &MeshSet) -> MeshSetInfo {
        check_mesh_set_valid_and_closed(mesh, &self.params)
    }

    /// Simplifies `input`, returning a strictly better mesh or the reason
    /// there is none.
    pub fn simplify(&self, input: &MeshSet) -> Result<SimplifiedMesh, SimplifyOutcome> {
        let input_info = self.validate(input);
        if !input_info.all_pointers_valid {
            return Err(self.structural_defect(&input_info.details));
        }
        tracing::debug!(input = %input_info, "simplifying mesh set");

        let mut best = Best {
            mesh: input.clone(),
            info: input_info.clone(),
            stages: Vec::new(),
        };

        if !best.info.zero_area_faces.is_empty() && best.info.open_edges.is_empty() {
            match remove_degenerate_faces_in_mesh_set(&best.mesh, &self.params) {
                Ok((candidate, _)) => self.consider(Stage::RemoveDegenerate, candidate, &mut best)?,
                Err(err) => self.stage_failed(Stage::RemoveDegenerate, err)?,
            }
        }

        let mut candidate = best.mesh.clone();
        let closed = best.info.is_closed();
        match merge_coplanar_faces_in_mesh_set(&mut candidate, &self.params, closed) {
            Ok(0) => {}
            Ok(_) => self.consider(Stage::MergeCoplanar, candidate, &mut best)?,
            Err(err) => self.stage_failed(Stage::MergeCoplanar, err)?,
        }

        let mut candidate = best.mesh.clone();
        if merge_aligned_edges_in_mesh_set(&mut candidate, &self.params) > 0 {
            self.consider(Stage::MergeAligned, candidate, &mut best)?;
        }

        if !best.info.mesh_set_valid {
            match retriangulate_mesh_set(&best.mesh, &self.params) {
                Ok(candidate) => self.consider(Stage::Retriangulate, candidate, &mut best)?,
                Err(err) => self.stage_failed(Stage::Retriangulate, err)?,
            }
        }

        if !best.info.is_better_for_bool_op(&input_info) {
            tracing::info!(result = %best.info, "mesh set could not be improved");
            self.params.emit(Diagnostic::NoImprovement {
                details: best.info.details.clone(),
            });
            return Err(SimplifyOutcome::NoImprovement);
        }

        best.mesh.orient_closed_shells_outward();
        if self.params.triangulate_result && !is_triangulated(&best.mesh) {
            self.triangulate_result(&mut best)?;
        }

        tracing::info!(
            faces_before = input_info.num_faces,
            faces_after = best.info.num_faces,
            open_before = input_info.num_open_edges(),
            open_after = best.info.num_open_edges(),
            valid = best.info.mesh_set_valid,
            "simplified mesh set"
        );

        Ok(SimplifiedMesh {
            mesh: best.mesh,
            info: best.info,
            stages: best.stages,
        })
    }

    /// Keeps `candidate` if it ranks no worse than the current best.
    fn consider(
        &self,
        stage: Stage,
        candidate: MeshSet,
        best: &mut Best,
    ) -> Result<(), SimplifyOutcome> {
        let info = self.validate(&candidate);
        if !info.all_pointers_valid {
            return Err(self.structural_defect(&format!("after {}: {}", stage.name(), info.details)));
        }

        #[cfg(feature = "debug_geometry")]
        self.params.emit(Diagnostic::MeshDump {
            stage: stage.name(),
            dump: crate::dump::mesh_set_to_obj(&candidate, stage.name()),
        });

        if info.is_not_worse_for_bool_op(&best.info) {
            tracing::debug!(stage = stage.name(), result = %info, "stage accepted");
            best.mesh = candidate;
            best.info = info;
            best.stages.push(stage);
        } else {
            tracing::warn!(stage = stage.name(), result = %info, "stage made the mesh worse, rolled back");
            self.params.emit(Diagnostic::StageRejected {
                stage: stage.name(),
                reason: info.details,
            });
        }
        Ok(())
    }

    /// Structural errors abort; anything else skips the stage.
    fn stage_failed(&self, stage: Stage, err: Error) -> Result<(), SimplifyOutcome> {
        if err.is_structural() {
            return Err(self.structural_defect(&format!("{}: {}", stage.name(), err)));
        }
        tracing::warn!(stage = stage.name(), error = %err, "stage failed");
        self.params.emit(Diagnostic::KernelFailure {
            stage: stage.name(),
            message: err.to_string(),
        });
        Ok(())
    }

    fn structural_defect(&self, message: &str) -> SimplifyOutcome {
        tracing::warn!(details = message, "structural defect in mesh set");
        self.params.emit(Diagnostic::StructuralDefect {
            message: message.to_string(),
        });
        SimplifyOutcome::StructuralDefect(message.to_string())
    }

    /// Triangulates the accepted result unless that would add open or
    /// degenerate elements.
    fn triangulate_result(&self, best: &mut Best) -> Result<(), SimplifyOutcome> {
        let candidate = match retriangulate_mesh_set(&best.mesh, &self.params) {
            Ok(candidate) => candidate,
            Err(err) => return self.stage_failed(Stage::Triangulate, err),
        };
        let info = self.validate(&candidate);
        let kept = (info.num_open_edges(), info.num_degenerate())
            <= (best.info.num_open_edges(), best.info.num_degenerate());
        if info.all_pointers_valid && kept {
            best.mesh = candidate;
            best.info = info;
            best.stages.push(Stage::Triangulate);
        } else {
            self.params.emit(Diagnostic::StageRejected {
                stage: Stage::Triangulate.name(),
                reason: info.details,
            });
        }
        Ok(())
    }
}

/// Simplifies `mesh` in place, replacing it only when the result is better.
///
/// Returns the validation record of whatever mesh is left in `mesh`.
pub fn simplify_mesh_set(mesh: &mut MeshSet, params: &GeomProcessingParams) -> MeshSetInfo {
    match MeshSimplifier::new(params.clone()).simplify(mesh) {
        Ok(simplified) => {
            *mesh = simplified.mesh;
            simplified.info
        }
        Err(_) => check_mesh_set_valid_and_closed(mesh, params),
    }
}
