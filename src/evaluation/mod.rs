//! Drift monitoring: report types, the window accumulator and workspace adapters.

pub mod domain;
pub mod engine;
pub mod repo_fs;
pub mod service;

pub use domain::{
    income_drift_report, DriftEngine, DriftReport, MetricSpec, Project, ProjectId,
    ReportWorkspace,
};
pub use engine::ProfileEngine;
pub use repo_fs::FsReportWorkspace;
pub use service::{detect_drift, resolve_project, IterateOutcome, MonitoringService, SharedMonitor};
