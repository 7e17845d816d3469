//! Command line entry points: the prediction server, the full batch run and
//! one subcommand per pipeline step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::common::config::AppCfg;
use crate::common::error::MonitorResult;
use crate::data::repo_fs::FsBlobStore;
use crate::evaluation::engine::ProfileEngine;
use crate::evaluation::repo_fs::FsReportWorkspace;
use crate::features::domain::income_feature_refs;
use crate::features::repo_fs::TableFeatureStore;
use crate::features::service::init_feature_store;
use crate::pipeline::domain::{Collaborators, PipelineParams};
use crate::pipeline::service::{self as steps, DriftArgs};
use crate::registry::repo_fs::FsModelRegistry;

use super::http;
use super::startup::predictor_from_config;

#[derive(Debug, Parser)]
#[command(name = "income-monitor", about = "Income classifier serving and drift monitoring", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve `POST /predict` on BIND_ADDR.
    Serve,
    /// Run read -> retrieve -> drift -> inference -> write.
    Pipeline(PipelineArgs),
    /// Download the entity table.
    #[command(name = "read-data")]
    ReadData(ReadDataArgs),
    /// Join historical features onto the entity table.
    #[command(name = "retrieve-features")]
    RetrieveFeatures(RetrieveFeaturesArgs),
    /// Report drift of a feature dataset against the reference.
    #[command(name = "detect-drift")]
    DetectDrift(DetectDriftArgs),
    /// Score a feature dataset.
    #[command(name = "run-inference")]
    RunInference(RunInferenceArgs),
    /// Upload an artefact.
    #[command(name = "write-data")]
    WriteData(WriteDataArgs),
}

/// Model selection; unset values come from the configuration.
#[derive(Debug, Clone, Default, Args)]
pub struct ModelArgs {
    #[arg(long = "model_name")]
    pub model_name: Option<String>,
    #[arg(long = "model_stage")]
    pub model_stage: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    #[arg(long = "entity_df_bucket")]
    pub entity_df_bucket: String,
    #[arg(long = "entity_df_filename")]
    pub entity_df_filename: String,
    #[arg(long = "feature_store_bucket_name")]
    pub feature_store_bucket_name: Option<String>,
    #[arg(long = "feature_store_config_file_name")]
    pub feature_store_config_file_name: Option<String>,
    #[arg(long = "reference_dataset_name")]
    pub reference_dataset_name: Option<String>,
    #[arg(long = "evidently_ui_project_name")]
    pub evidently_ui_project_name: String,
    #[arg(long = "feature_list")]
    pub feature_list: Option<String>,
    #[command(flatten)]
    pub model: ModelArgs,
    #[arg(long = "model_type")]
    pub model_type: Option<String>,
    #[arg(long = "output_bucket")]
    pub output_bucket: String,
    #[arg(long = "output_file_name")]
    pub output_file_name: String,
    #[arg(long = "work_dir")]
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ReadDataArgs {
    #[arg(long = "bucket_name")]
    pub bucket_name: String,
    #[arg(long = "file_name")]
    pub file_name: String,
    #[arg(long = "data_output_path")]
    pub data_output_path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct RetrieveFeaturesArgs {
    /// Bucket of the feature store config blob.
    #[arg(long = "bucket_name")]
    pub bucket_name: Option<String>,
    /// Name of the feature store config blob.
    #[arg(long = "file_name")]
    pub file_name: Option<String>,
    #[arg(long = "entity_df")]
    pub entity_df: PathBuf,
    #[arg(long = "feature_list")]
    pub feature_list: String,
    #[arg(long = "data_output")]
    pub data_output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct DetectDriftArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[arg(long = "reference_dataset_name")]
    pub reference_dataset_name: Option<String>,
    #[arg(long = "feature_dataset_path")]
    pub feature_dataset_path: PathBuf,
    #[arg(long = "evidently_ui_project_name")]
    pub evidently_ui_project_name: String,
    #[arg(long = "report_path", default_value = "drift_report.json")]
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct RunInferenceArgs {
    #[command(flatten)]
    pub model: ModelArgs,
    #[arg(long = "model_type")]
    pub model_type: Option<String>,
    #[arg(long = "input_data")]
    pub input_data: PathBuf,
    #[arg(long = "data_output")]
    pub data_output: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct WriteDataArgs {
    #[arg(long = "bucket_name")]
    pub bucket_name: String,
    #[arg(long = "file_name")]
    pub file_name: String,
    #[arg(long = "input_data_path")]
    pub input_data_path: PathBuf,
}

fn or_cfg<'a>(arg: &'a Option<String>, fallback: &'a str) -> &'a str {
    arg.as_deref().unwrap_or(fallback)
}

fn reference_name<'a>(arg: &'a Option<String>, cfg: &'a AppCfg) -> MonitorResult<&'a str> {
    match arg.as_deref() {
        Some(name) => Ok(name),
        None => cfg.require_reference_dataset(),
    }
}

fn open_store(
    cfg: &AppCfg,
    blobs: &FsBlobStore,
    bucket: &Option<String>,
    file: &Option<String>,
) -> MonitorResult<TableFeatureStore> {
    let mut cfg = cfg.clone();
    if let Some(bucket) = bucket {
        cfg.feature_registry_bucket = bucket.clone();
    }
    if let Some(file) = file {
        cfg.feature_registry_file = file.clone();
    }
    init_feature_store(&cfg, blobs, &scratch(&cfg, "features"))
}

fn scratch(cfg: &AppCfg, step: &str) -> PathBuf {
    Path::new(&cfg.data_root).join(step)
}

fn default_feature_list() -> String {
    income_feature_refs()
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Execute one command against the filesystem adapters configured in `cfg`.
pub async fn run(cli: Cli, cfg: &AppCfg) -> MonitorResult<()> {
    let blobs = FsBlobStore::new(cfg);
    let registry = FsModelRegistry::new(cfg);
    match cli.command {
        Commands::Serve => {
            let predictor = Arc::new(predictor_from_config(cfg)?);
            http::serve(predictor, &cfg.bind_addr).await
        }
        Commands::Pipeline(args) => {
            let store = open_store(
                cfg,
                &blobs,
                &args.feature_store_bucket_name,
                &args.feature_store_config_file_name,
            )?;
            let params = PipelineParams {
                entity_df_bucket: args.entity_df_bucket,
                entity_df_filename: args.entity_df_filename,
                feature_list: args.feature_list.unwrap_or_else(default_feature_list),
                reference_dataset_name: reference_name(&args.reference_dataset_name, cfg)?
                    .to_string(),
                project_name: args.evidently_ui_project_name,
                model_name: or_cfg(&args.model.model_name, &cfg.model_name).to_string(),
                model_type: or_cfg(&args.model_type, &cfg.model_type).to_string(),
                model_stage: or_cfg(&args.model.model_stage, &cfg.model_stage).to_string(),
                output_bucket: args.output_bucket,
                output_file_name: args.output_file_name,
                work_dir: args.work_dir.unwrap_or_else(|| scratch(cfg, "pipeline")),
            };
            let run = steps::run_pipeline(
                &params,
                Collaborators {
                    blobs: &blobs,
                    features: &store,
                    registry: &registry,
                    engine: &ProfileEngine::new(),
                    workspace: &FsReportWorkspace::new(cfg),
                },
            )?;
            tracing::info!(report = %run.report_id, rows = run.rows, "pipeline finished");
            Ok(())
        }
        Commands::ReadData(args) => {
            steps::read_data(&blobs, &args.bucket_name, &args.file_name, &args.data_output_path)?;
            Ok(())
        }
        Commands::RetrieveFeatures(args) => {
            let store = open_store(cfg, &blobs, &args.bucket_name, &args.file_name)?;
            steps::retrieve_features(&store, &args.entity_df, &args.feature_list, &args.data_output)?;
            Ok(())
        }
        Commands::DetectDrift(args) => {
            let report = steps::detect_drift(
                &registry,
                &blobs,
                &ProfileEngine::new(),
                &FsReportWorkspace::new(cfg),
                &DriftArgs {
                    model_name: or_cfg(&args.model.model_name, &cfg.model_name),
                    model_stage: or_cfg(&args.model.model_stage, &cfg.model_stage),
                    reference_dataset_name: reference_name(&args.reference_dataset_name, cfg)?,
                    feature_dataset_path: &args.feature_dataset_path,
                    project_name: &args.evidently_ui_project_name,
                    report_path: &args.report_path,
                    scratch_dir: &scratch(cfg, "reference"),
                },
            )?;
            tracing::info!(report = %report.id, "report written");
            Ok(())
        }
        Commands::RunInference(args) => {
            steps::run_inference(
                &registry,
                or_cfg(&args.model.model_name, &cfg.model_name),
                or_cfg(&args.model_type, &cfg.model_type),
                or_cfg(&args.model.model_stage, &cfg.model_stage),
                &args.input_data,
                &args.data_output,
            )?;
            Ok(())
        }
        Commands::WriteData(args) => {
            steps::write_data(&blobs, &args.bucket_name, &args.file_name, &args.input_data_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::repo_fs::BlobStore;

    #[test]
    fn step_arguments_keep_snake_case_names() {
        let cli = Cli::try_parse_from([
            "income-monitor",
            "run-inference",
            "--model_name",
            "rf",
            "--model_type",
            "sklearn",
            "--input_data",
            "features.csv",
            "--data_output",
            "scored.csv",
        ])
        .unwrap();
        match cli.command {
            Commands::RunInference(args) => {
                assert_eq!(args.model.model_name.as_deref(), Some("rf"));
                assert_eq!(args.model.model_stage, None);
                assert_eq!(args.input_data, PathBuf::from("features.csv"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn pipeline_requires_output_location() {
        let err = Cli::try_parse_from([
            "income-monitor",
            "pipeline",
            "--entity_df_bucket",
            "entities",
            "--entity_df_filename",
            "entity_df.csv",
            "--evidently_ui_project_name",
            "income",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn default_feature_list_parses_back() {
        let refs = crate::features::parse_feature_list(&default_feature_list()).unwrap();
        assert_eq!(refs, income_feature_refs());
    }

    #[tokio::test]
    async fn read_and_write_data_round_through_blob_root() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppCfg::from_pairs(&HashMap::from([(
            "BLOB_ROOT".to_string(),
            dir.path().join("blobs").display().to_string(),
        )]))
        .unwrap();
        let blobs = FsBlobStore::new(&cfg);
        blobs.put("in", "entities.csv", b"user_id\n1\n2\n").unwrap();

        let local = dir.path().join("local.csv");
        let read = Cli::try_parse_from([
            "income-monitor",
            "read-data",
            "--bucket_name",
            "in",
            "--file_name",
            "entities.csv",
            "--data_output_path",
            local.to_str().unwrap(),
        ])
        .unwrap();
        run(read, &cfg).await.unwrap();

        let write = Cli::try_parse_from([
            "income-monitor",
            "write-data",
            "--bucket_name",
            "out",
            "--file_name",
            "copy.csv",
            "--input_data_path",
            local.to_str().unwrap(),
        ])
        .unwrap();
        run(write, &cfg).await.unwrap();
        assert_eq!(blobs.get("out", "copy.csv").unwrap(), b"user_id\n1\n2\n");
    }
}
