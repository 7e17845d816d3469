//! Runtime configuration loaded from an optional key=value file and the environment.
//!
//! The snapshot is passed by value into every collaborator constructor; nothing
//! here writes back into the process environment.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use super::error::{MonitorError, MonitorResult};

/// Env file read when `ENV_NAME` is not `production`.
pub const DEFAULT_ENV_FILE: &str = ".env";
/// Env file read when `ENV_NAME=production`.
pub const PRODUCTION_ENV_FILE: &str = "production.env";

/// Snapshot of configuration values consumed by the core.
#[derive(Clone, Debug)]
pub struct AppCfg {
    pub data_root: String,
    pub blob_root: String,
    pub registry_root: String,
    pub workspace_root: String,
    pub model_name: String,
    pub model_stage: String,
    pub model_type: String,
    pub feature_registry_bucket: String,
    pub feature_registry_file: String,
    pub redis_host: String,
    pub redis_password: String,
    pub reference_dataset_name: Option<String>,
    pub project_id: Option<String>,
    pub window_size: usize,
    pub log_level: String,
    pub log_json: bool,
    pub bind_addr: String,
}

impl AppCfg {
    /// Layer defaults, the env file picked by `ENV_NAME`, then the process environment.
    pub fn load() -> MonitorResult<Self> {
        let file_name = env_file_name(env::var("ENV_NAME").ok().as_deref());
        let mut pairs = match fs::read_to_string(Path::new(file_name)) {
            Ok(text) => parse_env_file(&text),
            Err(_) => HashMap::new(),
        };
        for (key, value) in env::vars() {
            pairs.insert(key, value);
        }
        Self::from_pairs(&pairs)
    }

    /// Build a snapshot from explicit key/value pairs.
    pub fn from_pairs(pairs: &HashMap<String, String>) -> MonitorResult<Self> {
        let get = |key: &str, default: &str| -> String {
            pairs
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        let opt = |key: &str| -> Option<String> {
            pairs.get(key).filter(|v| !v.trim().is_empty()).cloned()
        };

        let raw_window = get("EVIDENTLY_REPORT_WINDOW_SIZE", "50");
        let window_size = match raw_window.trim().parse::<usize>() {
            Ok(size) if size > 0 => size,
            _ => {
                return Err(MonitorError::config(format!(
                    "EVIDENTLY_REPORT_WINDOW_SIZE must be a positive integer, got '{raw_window}'"
                )))
            }
        };

        let data_root = get("DATA_ROOT", "./data");
        Ok(Self {
            blob_root: get("BLOB_ROOT", &format!("{data_root}/blobs")),
            registry_root: get("REGISTRY_ROOT", &format!("{data_root}/registry")),
            workspace_root: get("WORKSPACE_ROOT", &format!("{data_root}/workspace")),
            data_root,
            model_name: get("MODEL_NAME", "random-forest-classifier"),
            model_stage: get("MODEL_STAGE", "Production"),
            model_type: get("MODEL_TYPE", "sklearn"),
            feature_registry_bucket: get("FEATURE_REGISTRY_BUCKET_NAME", "feast"),
            feature_registry_file: get("FEATURE_REGISTRY_FILE_NAME", "feature_store.yaml"),
            redis_host: get("FEAST_REDIS_HOST", "localhost"),
            redis_password: get("FEAST_REDIS_PASSWORD", ""),
            reference_dataset_name: opt("REFERENCE_DATASET_NAME"),
            project_id: opt("EVIDENTLY_PROJECT_ID"),
            window_size,
            log_level: get("LOG_LEVEL", "info"),
            log_json: matches!(get("LOG_JSON", "false").as_str(), "1" | "true" | "yes"),
            bind_addr: get("BIND_ADDR", "0.0.0.0:3000"),
        })
    }

    /// Reference dataset tag, required once drift monitoring is enabled.
    pub fn require_reference_dataset(&self) -> MonitorResult<&str> {
        self.reference_dataset_name
            .as_deref()
            .ok_or_else(|| MonitorError::config("REFERENCE_DATASET_NAME is not set"))
    }

    pub fn require_project_id(&self) -> MonitorResult<&str> {
        self.project_id
            .as_deref()
            .ok_or_else(|| MonitorError::config("EVIDENTLY_PROJECT_ID is not set"))
    }
}

/// Pick the env file for the given `ENV_NAME`.
pub fn env_file_name(env_name: Option<&str>) -> &'static str {
    match env_name {
        Some("production") => PRODUCTION_ENV_FILE,
        _ => DEFAULT_ENV_FILE,
    }
}

/// Parse `KEY=value` lines; blank lines and `#` comments are skipped, quotes trimmed.
pub fn parse_env_file(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
