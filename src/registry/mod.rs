//! Model registry domain: versions, run artefacts and reference datasets.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{DatasetInput, ModelKind, ModelRegistry, ModelVersion, RunId};
pub use repo_fs::FsModelRegistry;
