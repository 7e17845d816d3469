//! Domain types for registered model versions and their run artefacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::{MonitorError, MonitorResult};
use crate::inference::domain::{Classifier, ColumnList};

/// Identifier of the training run that produced a model version.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One registered version of a named model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: String,
    /// Lifecycle stage such as `Production` or `Staging`.
    pub stage: String,
    pub run_id: RunId,
}

/// Dataset logged as an input of a training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetInput {
    /// JSON document with a `uri` field, as logged by the training job.
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
struct DatasetSource {
    uri: String,
}

impl DatasetInput {
    /// Blob location named by the source document.
    pub fn source_uri(&self) -> MonitorResult<String> {
        let source: DatasetSource = serde_json::from_str(&self.source).map_err(|e| {
            MonitorError::config(format!("dataset source is not a uri document: {e}"))
        })?;
        Ok(source.uri)
    }
}

/// Model flavours the registry can load.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModelKind {
    Sklearn,
    Xgboost,
    Tensorflow,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Sklearn => "sklearn",
            ModelKind::Xgboost => "xgboost",
            ModelKind::Tensorflow => "tensorflow",
        }
    }
}

impl FromStr for ModelKind {
    type Err = MonitorError;

    fn from_str(raw: &str) -> MonitorResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sklearn" => Ok(ModelKind::Sklearn),
            "xgboost" => Ok(ModelKind::Xgboost),
            "tensorflow" => Ok(ModelKind::Tensorflow),
            _ => Err(MonitorError::unsupported(format!(
                "Model type '{raw}' is not supported."
            ))),
        }
    }
}

/// Model registry and artefact store contract.
pub trait ModelRegistry: Send + Sync {
    fn search_model_versions(&self, name: &str) -> MonitorResult<Vec<ModelVersion>>;
    fn column_list(&self, run: &RunId) -> MonitorResult<ColumnList>;
    fn dataset_inputs(&self, run: &RunId) -> MonitorResult<Vec<DatasetInput>>;
    fn load_model(&self, version: &ModelVersion, kind: ModelKind) -> MonitorResult<Box<dyn Classifier>>;
}
