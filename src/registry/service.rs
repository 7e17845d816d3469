//! Resolving the production model run and its reference dataset.

use std::path::Path;

use crate::common::error::{MonitorError, MonitorResult};
use crate::data::domain::Frame;
use crate::data::repo_fs::{BlobStore, BlobUri};
use crate::data::service::read_csv;

use super::domain::{ModelRegistry, ModelVersion, RunId};

/// First registered version of `name` in `stage`.
pub fn resolve_version(
    registry: &dyn ModelRegistry,
    name: &str,
    stage: &str,
) -> MonitorResult<ModelVersion> {
    registry
        .search_model_versions(name)?
        .into_iter()
        .find(|v| v.stage == stage)
        .ok_or_else(|| {
            MonitorError::model_missing(format!("No model found in stage {stage} for model {name}."))
        })
}

/// Run that produced the `stage` version of `name`.
pub fn resolve_run(registry: &dyn ModelRegistry, name: &str, stage: &str) -> MonitorResult<RunId> {
    resolve_version(registry, name, stage).map(|v| v.run_id)
}

/// Location of the run input tagged with `dataset_name`.
pub fn reference_uri(
    registry: &dyn ModelRegistry,
    run: &RunId,
    dataset_name: &str,
) -> MonitorResult<BlobUri> {
    let input = registry
        .dataset_inputs(run)?
        .into_iter()
        .find(|input| input.tags.iter().any(|tag| tag == dataset_name))
        .ok_or_else(|| {
            MonitorError::config(format!("Reference dataset {dataset_name} not found."))
        })?;
    BlobUri::parse(&input.source_uri()?)
}

/// Download the reference dataset into `scratch_dir` and load it.
pub fn load_reference(
    registry: &dyn ModelRegistry,
    blobs: &dyn BlobStore,
    run: &RunId,
    dataset_name: &str,
    scratch_dir: &Path,
) -> MonitorResult<Frame> {
    let uri = reference_uri(registry, run, dataset_name)?;
    let local = scratch_dir.join(uri.file_name());
    tracing::info!(bucket = %uri.bucket, object = %uri.object, "downloading reference dataset");
    blobs.fetch_to(&uri.bucket, &uri.object, &local)?;
    read_csv(&local)
}
