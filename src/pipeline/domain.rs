//! Pipeline parameters, collaborators and run record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::repo_fs::BlobStore;
use crate::evaluation::domain::{DriftEngine, ReportWorkspace};
use crate::features::domain::FeatureStore;
use crate::registry::domain::ModelRegistry;

/// Arguments of a full batch run, named after the step arguments they feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub entity_df_bucket: String,
    pub entity_df_filename: String,
    /// Comma-separated `view:field` list.
    pub feature_list: String,
    pub reference_dataset_name: String,
    pub project_name: String,
    pub model_name: String,
    pub model_type: String,
    pub model_stage: String,
    pub output_bucket: String,
    pub output_file_name: String,
    /// Directory the intermediate artefacts are written to.
    pub work_dir: PathBuf,
}

/// External systems a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub blobs: &'a dyn BlobStore,
    pub features: &'a dyn FeatureStore,
    pub registry: &'a dyn ModelRegistry,
    pub engine: &'a dyn DriftEngine,
    pub workspace: &'a dyn ReportWorkspace,
}

/// Artefacts produced by a completed run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineRun {
    pub data_path: PathBuf,
    pub features_path: PathBuf,
    pub report_path: PathBuf,
    pub predictions_path: PathBuf,
    pub report_id: Uuid,
    pub rows: usize,
}
