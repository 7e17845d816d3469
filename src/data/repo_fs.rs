//! Blob storage contract and its filesystem-backed implementation.
//!
//! Buckets are directories under `cfg.blob_root`; object keys may contain `/`.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::common::config::AppCfg;
use crate::common::error::{MonitorError, MonitorResult};

/// Get/put of named blobs within named buckets.
pub trait BlobStore: Send + Sync {
    fn get(&self, bucket: &str, object: &str) -> MonitorResult<Vec<u8>>;
    fn put(&self, bucket: &str, object: &str, bytes: &[u8]) -> MonitorResult<()>;

    /// Download an object into a local file.
    fn fetch_to(&self, bucket: &str, object: &str, dest: &Path) -> MonitorResult<()> {
        let bytes = self.get(bucket, object)?;
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, bytes)?;
        Ok(())
    }

    /// Upload a local file.
    fn upload_from(&self, bucket: &str, object: &str, src: &Path) -> MonitorResult<()> {
        let bytes = fs::read(src)?;
        self.put(bucket, object, &bytes)
    }
}

/// Location of a blob written as `bucket/path/to/object`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlobUri {
    pub bucket: String,
    pub object: String,
}

impl BlobUri {
    pub fn parse(uri: &str) -> MonitorResult<Self> {
        let trimmed = uri.trim().trim_start_matches("s3://");
        match trimmed.split_once('/') {
            Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => Ok(Self {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            _ => Err(MonitorError::invalid(format!(
                "blob uri '{uri}' must look like bucket/object"
            ))),
        }
    }

    /// Last path segment, used as the local download name.
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }
}

/// Filesystem store rooted at `cfg.blob_root`.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(&cfg.blob_root)
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, object: &str) -> MonitorResult<PathBuf> {
        let relative = Path::new(bucket).join(object);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || bucket.is_empty() || object.is_empty() {
            return Err(MonitorError::invalid(format!(
                "invalid blob location {bucket}/{object}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn get(&self, bucket: &str, object: &str) -> MonitorResult<Vec<u8>> {
        let path = self.object_path(bucket, object)?;
        fs::read(&path).map_err(|e| {
            MonitorError::dependency(format!("blob {bucket}/{object} unavailable: {e}"))
        })
    }

    fn put(&self, bucket: &str, object: &str, bytes: &[u8]) -> MonitorResult<()> {
        let path = self.object_path(bucket, object)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(bytes)?;
        tracing::debug!(bucket, object, bytes = bytes.len(), "blob stored");
        Ok(())
    }
}
