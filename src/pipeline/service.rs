//! Batch pipeline steps and the run that chains them.
//!
//! Steps only share state through the artefact paths they are given. A run
//! executes read -> retrieve -> drift -> inference -> write and stops at the
//! first failing step.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::common::error::MonitorResult;
use crate::common::log::log_event;
use crate::data::repo_fs::BlobStore;
use crate::data::service::{read_csv, read_csv_keeping_text, write_csv};
use crate::evaluation::domain::{DriftEngine, DriftReport, ReportWorkspace};
use crate::evaluation::service as monitoring;
use crate::features::domain::{parse_feature_list, FeatureStore, ENTITY_KEY};
use crate::inference::service::score_frame;
use crate::registry::domain::{ModelKind, ModelRegistry};
use crate::registry::service::{load_reference, resolve_run, resolve_version};

use super::domain::{Collaborators, PipelineParams, PipelineRun};

/// Download the entity table and store it at `data_output_path`.
pub fn read_data(
    blobs: &dyn BlobStore,
    bucket_name: &str,
    file_name: &str,
    data_output_path: &Path,
) -> MonitorResult<PathBuf> {
    tracing::info!(bucket = bucket_name, file = file_name, "downloading entity data");
    blobs.fetch_to(bucket_name, file_name, data_output_path)?;
    let frame = read_csv(data_output_path)?;
    tracing::info!(rows = frame.len(), path = %data_output_path.display(), "entity data saved");
    Ok(data_output_path.to_path_buf())
}

/// Enrich the entity table with historical features.
pub fn retrieve_features(
    store: &dyn FeatureStore,
    entity_df: &Path,
    feature_list: &str,
    data_output: &Path,
) -> MonitorResult<PathBuf> {
    let refs = parse_feature_list(feature_list)?;
    tracing::info!(features = refs.len(), "requested features");
    let entities = read_csv_keeping_text(entity_df, &[ENTITY_KEY])?;
    let features = store.historical_features(&entities, &refs)?;
    write_csv(&features, data_output)?;
    tracing::info!(rows = features.len(), path = %data_output.display(), "features retrieved");
    Ok(data_output.to_path_buf())
}

/// Inputs of the drift step besides its collaborators.
#[derive(Clone, Debug)]
pub struct DriftArgs<'a> {
    pub model_name: &'a str,
    pub model_stage: &'a str,
    pub reference_dataset_name: &'a str,
    pub feature_dataset_path: &'a Path,
    pub project_name: &'a str,
    pub report_path: &'a Path,
    pub scratch_dir: &'a Path,
}

/// Compare the retrieved features against the production model's reference
/// dataset and file the report.
pub fn detect_drift(
    registry: &dyn ModelRegistry,
    blobs: &dyn BlobStore,
    engine: &dyn DriftEngine,
    workspace: &dyn ReportWorkspace,
    args: &DriftArgs<'_>,
) -> MonitorResult<DriftReport> {
    let run = resolve_run(registry, args.model_name, args.model_stage)?;
    let reference = load_reference(
        registry,
        blobs,
        &run,
        args.reference_dataset_name,
        args.scratch_dir,
    )?;
    let features = read_csv(args.feature_dataset_path)?;
    monitoring::detect_drift(
        engine,
        workspace,
        &reference,
        &features,
        args.project_name,
        args.report_path,
    )
}

/// Score the retrieved features with the model registered at `model_stage`.
pub fn run_inference(
    registry: &dyn ModelRegistry,
    model_name: &str,
    model_type: &str,
    model_stage: &str,
    input_data: &Path,
    data_output: &Path,
) -> MonitorResult<PathBuf> {
    let kind: ModelKind = model_type.parse()?;
    let version = resolve_version(registry, model_name, model_stage)?;
    let columns = registry.column_list(&version.run_id)?;
    let model = registry.load_model(&version, kind)?;

    let input = read_csv(input_data)?;
    let scored = score_frame(model.as_ref(), &input, &columns)?;
    write_csv(&scored, data_output)?;
    Ok(data_output.to_path_buf())
}

/// Upload a produced artefact.
pub fn write_data(
    blobs: &dyn BlobStore,
    bucket_name: &str,
    file_name: &str,
    input_data_path: &Path,
) -> MonitorResult<()> {
    let frame = read_csv(input_data_path)?;
    blobs.upload_from(bucket_name, file_name, input_data_path)?;
    tracing::info!(bucket = bucket_name, file = file_name, rows = frame.len(), "output uploaded");
    Ok(())
}

/// Run every step in order inside `params.work_dir`.
pub fn run_pipeline(params: &PipelineParams, with: Collaborators<'_>) -> MonitorResult<PipelineRun> {
    let start = Instant::now();
    let work = params.work_dir.as_path();
    let data_path = work.join("entity_df.csv");
    let features_path = work.join("features.csv");
    let report_path = work.join("drift_report.json");
    let predictions_path = work.join("predictions.csv");

    read_data(
        with.blobs,
        &params.entity_df_bucket,
        &params.entity_df_filename,
        &data_path,
    )?;
    retrieve_features(with.features, &data_path, &params.feature_list, &features_path)?;
    let report = detect_drift(
        with.registry,
        with.blobs,
        with.engine,
        with.workspace,
        &DriftArgs {
            model_name: &params.model_name,
            model_stage: &params.model_stage,
            reference_dataset_name: &params.reference_dataset_name,
            feature_dataset_path: &features_path,
            project_name: &params.project_name,
            report_path: &report_path,
            scratch_dir: &work.join("reference"),
        },
    )?;
    run_inference(
        with.registry,
        &params.model_name,
        &params.model_type,
        &params.model_stage,
        &features_path,
        &predictions_path,
    )?;
    write_data(
        with.blobs,
        &params.output_bucket,
        &params.output_file_name,
        &predictions_path,
    )?;

    log_event("pipeline", "run", 0, start.elapsed().as_millis() as i64);
    Ok(PipelineRun {
        data_path,
        features_path,
        report_path,
        predictions_path,
        report_id: report.id,
        rows: report.current_rows,
    })
}
