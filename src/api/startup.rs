//! Process-wide wiring of the serving path.
//!
//! Everything here runs once before the server accepts requests; any failure
//! aborts startup.

use std::path::Path;
use std::sync::Arc;

use crate::common::config::AppCfg;
use crate::common::error::MonitorResult;
use crate::data::repo_fs::{BlobStore, FsBlobStore};
use crate::evaluation::domain::{income_drift_report, DriftEngine, ProjectId, ReportWorkspace};
use crate::evaluation::engine::ProfileEngine;
use crate::evaluation::repo_fs::FsReportWorkspace;
use crate::evaluation::service::{MonitoringService, SharedMonitor};
use crate::features::domain::{income_feature_refs, FeatureStore};
use crate::features::service::init_feature_store;
use crate::inference::service::Predictor;
use crate::registry::domain::{ModelKind, ModelRegistry};
use crate::registry::repo_fs::FsModelRegistry;
use crate::registry::service::{load_reference, resolve_version};

/// Collaborators the serving path is assembled from.
pub struct ServingDeps {
    pub blobs: Arc<dyn BlobStore>,
    pub registry: Arc<dyn ModelRegistry>,
    pub store: Arc<dyn FeatureStore>,
    pub engine: Arc<dyn DriftEngine>,
    pub workspace: Arc<dyn ReportWorkspace>,
}

/// Resolve the model, its column list and, when a reference dataset is
/// configured, the drift accumulator.
pub fn build_predictor(cfg: &AppCfg, deps: ServingDeps, scratch_dir: &Path) -> MonitorResult<Predictor> {
    let kind: ModelKind = cfg.model_type.parse()?;
    let version = resolve_version(deps.registry.as_ref(), &cfg.model_name, &cfg.model_stage)?;
    let columns = deps.registry.column_list(&version.run_id)?;
    let model = deps.registry.load_model(&version, kind)?;
    tracing::info!(
        model = %cfg.model_name,
        stage = %cfg.model_stage,
        run = %version.run_id,
        columns = columns.len(),
        "model resolved"
    );

    let predictor = Predictor::new(deps.store, Arc::from(model), columns, income_feature_refs());
    let Some(dataset_name) = cfg.reference_dataset_name.as_deref() else {
        tracing::info!("no reference dataset configured, drift monitoring disabled");
        return Ok(predictor);
    };

    let project = ProjectId::new(cfg.require_project_id()?);
    let reference = load_reference(
        deps.registry.as_ref(),
        deps.blobs.as_ref(),
        &version.run_id,
        dataset_name,
        scratch_dir,
    )?;
    tracing::info!(
        rows = reference.len(),
        window = cfg.window_size,
        project = project.as_str(),
        "drift monitoring enabled"
    );
    let service = MonitoringService::new(
        income_drift_report(),
        Arc::new(reference),
        deps.engine,
        deps.workspace,
        project,
        cfg.window_size,
    )?;
    Ok(predictor.with_monitor(SharedMonitor::new(service)))
}

/// Build the predictor on the filesystem adapters rooted in `cfg`.
pub fn predictor_from_config(cfg: &AppCfg) -> MonitorResult<Predictor> {
    let scratch_dir = Path::new(&cfg.data_root).join("serving");
    let blobs = Arc::new(FsBlobStore::new(cfg));
    let store = init_feature_store(cfg, blobs.as_ref(), &scratch_dir)?;
    let deps = ServingDeps {
        blobs,
        registry: Arc::new(FsModelRegistry::new(cfg)),
        store: Arc::new(store),
        engine: Arc::new(ProfileEngine::new()),
        workspace: Arc::new(FsReportWorkspace::new(cfg)),
    };
    build_predictor(cfg, deps, &scratch_dir)
}
