//! Filesystem model registry.
//!
//! Layout under `cfg.registry_root`:
//! `models/<name>/versions.json` lists versions, and each run keeps
//! `runs/<run>/column_list.json`, `runs/<run>/inputs.json` and
//! `runs/<run>/model.json`. Every flavour is exported as a [`LinearModel`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::common::config::AppCfg;
use crate::common::error::{MonitorError, MonitorResult};
use crate::inference::domain::{Classifier, ColumnList, LinearModel};

use super::domain::{DatasetInput, ModelKind, ModelRegistry, ModelVersion, RunId};

pub struct FsModelRegistry {
    root: PathBuf,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> MonitorResult<T> {
    let bytes = fs::read(path).map_err(|e| {
        MonitorError::dependency(format!("registry artefact {} unavailable: {e}", path.display()))
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> MonitorResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?)?;
    Ok(())
}

impl FsModelRegistry {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.registry_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn versions_path(&self, name: &str) -> PathBuf {
        self.root.join("models").join(name).join("versions.json")
    }

    fn run_dir(&self, run: &RunId) -> PathBuf {
        self.root.join("runs").join(run.as_str())
    }

    /// Record a version together with its run artefacts.
    pub fn register(
        &self,
        version: &ModelVersion,
        columns: &ColumnList,
        inputs: &[DatasetInput],
        model: &LinearModel,
    ) -> MonitorResult<()> {
        let run_dir = self.run_dir(&version.run_id);
        write_json(&run_dir.join("column_list.json"), columns)?;
        write_json(&run_dir.join("inputs.json"), inputs)?;
        write_json(&run_dir.join("model.json"), model)?;

        let mut versions = self.search_model_versions(&version.name)?;
        versions.retain(|v| v.version != version.version);
        versions.push(version.clone());
        write_json(&self.versions_path(&version.name), &versions)
    }
}

impl ModelRegistry for FsModelRegistry {
    fn search_model_versions(&self, name: &str) -> MonitorResult<Vec<ModelVersion>> {
        let path = self.versions_path(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    fn column_list(&self, run: &RunId) -> MonitorResult<ColumnList> {
        read_json(&self.run_dir(run).join("column_list.json"))
    }

    fn dataset_inputs(&self, run: &RunId) -> MonitorResult<Vec<DatasetInput>> {
        let path = self.run_dir(run).join("inputs.json");
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    fn load_model(&self, version: &ModelVersion, kind: ModelKind) -> MonitorResult<Box<dyn Classifier>> {
        let model: LinearModel = read_json(&self.run_dir(&version.run_id).join("model.json"))?;
        tracing::info!(
            model = %version.name,
            version = %version.version,
            flavour = kind.as_str(),
            "model loaded"
        );
        Ok(Box::new(model))
    }
}
