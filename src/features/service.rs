//! Feature-store initialisation from the shared config blob.
//!
//! The blob is a YAML document; before use its online-store connection string
//! is pointed at the configured Redis host and the result is written next to
//! the process. The offline store path names the directory of view tables.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;

use crate::common::config::AppCfg;
use crate::common::error::{MonitorError, MonitorResult};
use crate::data::repo_fs::BlobStore;

use super::repo_fs::TableFeatureStore;

/// Local file name the prepared config is written to.
pub const STORE_CONFIG_FILE: &str = "feature_store.yaml";

/// Rewrite `online_store.connection_string` for the given Redis endpoint.
pub fn patch_connection_string(
    raw_yaml: &str,
    redis_host: &str,
    redis_password: &str,
) -> MonitorResult<String> {
    let mut doc: YamlValue = serde_yaml::from_str(raw_yaml)?;
    let online = doc
        .get_mut("online_store")
        .and_then(YamlValue::as_mapping_mut)
        .ok_or_else(|| MonitorError::config("feature store config has no online_store mapping"))?;
    online.insert(
        YamlValue::from("connection_string"),
        YamlValue::from(format!("{redis_host}:6379,password={redis_password}")),
    );
    Ok(serde_yaml::to_string(&doc)?)
}

/// Fetch, patch and persist the config blob; returns the local path.
pub fn prepare_store_config(
    cfg: &AppCfg,
    blobs: &dyn BlobStore,
    scratch_dir: &Path,
) -> MonitorResult<PathBuf> {
    let raw = blobs.get(&cfg.feature_registry_bucket, &cfg.feature_registry_file)?;
    let raw = String::from_utf8(raw)
        .map_err(|_| MonitorError::config("feature store config is not valid UTF-8"))?;
    let patched = patch_connection_string(&raw, &cfg.redis_host, &cfg.redis_password)?;

    fs::create_dir_all(scratch_dir)?;
    let path = scratch_dir.join(STORE_CONFIG_FILE);
    fs::write(&path, patched)?;
    tracing::info!(path = %path.display(), "feature store config prepared");
    Ok(path)
}

/// Directory of view tables named by `offline_store.path`.
pub fn offline_store_path(config_path: &Path) -> MonitorResult<PathBuf> {
    let doc: YamlValue = serde_yaml::from_str(&fs::read_to_string(config_path)?)?;
    let path = doc
        .get("offline_store")
        .and_then(|store| store.get("path"))
        .and_then(YamlValue::as_str)
        .ok_or_else(|| MonitorError::config("feature store config has no offline_store.path"))?;
    let path = PathBuf::from(path);
    if path.is_relative() {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        return Ok(base.join(path));
    }
    Ok(path)
}

/// Prepare the config blob and open the store it describes.
pub fn init_feature_store(
    cfg: &AppCfg,
    blobs: &dyn BlobStore,
    scratch_dir: &Path,
) -> MonitorResult<TableFeatureStore> {
    let config_path = prepare_store_config(cfg, blobs, scratch_dir)?;
    TableFeatureStore::open(offline_store_path(&config_path)?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::data::repo_fs::FsBlobStore;
    use crate::data::Value;
    use crate::features::domain::{FeatureRef, FeatureStore};

    const CONFIG: &str = "project: income\nonline_store:\n  type: redis\n  connection_string: placeholder\noffline_store:\n  path: tables\n";

    #[test]
    fn connection_string_points_at_redis() {
        let patched = patch_connection_string(CONFIG, "redis.local", "s3cret").unwrap();
        let doc: YamlValue = serde_yaml::from_str(&patched).unwrap();
        assert_eq!(
            doc["online_store"]["connection_string"].as_str(),
            Some("redis.local:6379,password=s3cret")
        );
        assert_eq!(doc["online_store"]["type"].as_str(), Some("redis"));
    }

    #[test]
    fn missing_online_store_is_config_error() {
        let err = patch_connection_string("project: income\n", "h", "p").unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::Config);
    }

    #[test]
    fn init_opens_tables_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppCfg::from_pairs(&HashMap::new()).unwrap();
        let blobs = FsBlobStore::at(dir.path().join("blobs"));
        blobs
            .put(&cfg.feature_registry_bucket, &cfg.feature_registry_file, CONFIG.as_bytes())
            .unwrap();
        let scratch = dir.path().join("work");
        fs::create_dir_all(scratch.join("tables")).unwrap();
        fs::write(scratch.join("tables/demographic.csv"), "user_id,Sex\n3,Female\n").unwrap();

        let store = init_feature_store(&cfg, &blobs, &scratch).unwrap();
        let frame = store
            .online_features(&[FeatureRef::new("demographic", "Sex")], &[Value::from(3i64)])
            .unwrap();
        assert_eq!(frame.rows()[0][1], Value::from("Female"));
        assert!(scratch.join(STORE_CONFIG_FILE).exists());
    }
}
