//! Batch inference pipeline with drift detection.

pub mod domain;
pub mod service;

pub use domain::{Collaborators, PipelineParams, PipelineRun};
pub use service::{
    detect_drift, read_data, retrieve_features, run_inference, run_pipeline, write_data, DriftArgs,
};
