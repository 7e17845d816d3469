//! Data domain: tabular frames, CSV artefacts and blob storage.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Frame, Value};
pub use repo_fs::{BlobStore, BlobUri, FsBlobStore};
