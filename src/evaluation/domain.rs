//! Domain primitives for drift reports and the collaborators that produce
//! and persist them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::MonitorResult;
use crate::data::domain::Frame;

/// Feature columns the income drift report inspects.
pub const INCOME_DRIFT_COLUMNS: [&str; 8] = [
    "Education",
    "Marital-Status",
    "Native_country",
    "Occupation",
    "Race",
    "Relationship",
    "Sex",
    "Workclass",
];

/// A metric requested from the report engine.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricSpec {
    DatasetDrift,
    DatasetMissingValues,
    ColumnDrift { column: String },
    ColumnSummary { column: String },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStatus {
    Computed,
    NotComputed,
}

/// Engine output for one metric.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric: MetricSpec,
    pub status: MetricStatus,
    pub value: serde_json::Value,
}

/// Point-in-time comparison of a reference dataset against a current sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub id: Uuid,
    pub metrics: Vec<MetricSpec>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: Vec<MetricResult>,
    #[serde(default)]
    pub reference_rows: usize,
    #[serde(default)]
    pub current_rows: usize,
}

impl DriftReport {
    pub fn new(metrics: Vec<MetricSpec>) -> Self {
        Self {
            id: Uuid::new_v4(),
            metrics,
            timestamp: None,
            results: Vec::new(),
            reference_rows: 0,
            current_rows: 0,
        }
    }

    /// Unstamped, unrun copy with a new id; used as a per-trigger instance.
    pub fn fresh(&self) -> Self {
        Self::new(self.metrics.clone())
    }
}

/// The report run for the income classifier.
pub fn income_drift_report() -> DriftReport {
    let mut metrics = vec![MetricSpec::DatasetDrift, MetricSpec::DatasetMissingValues];
    for column in INCOME_DRIFT_COLUMNS {
        metrics.push(MetricSpec::ColumnDrift {
            column: column.to_string(),
        });
        metrics.push(MetricSpec::ColumnSummary {
            column: column.to_string(),
        });
    }
    DriftReport::new(metrics)
}

/// Identifier of a project in the report workspace.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
}

/// Produces report results from two tabular datasets.
pub trait DriftEngine: Send + Sync {
    fn run(&self, report: &mut DriftReport, reference: &Frame, current: &Frame) -> MonitorResult<()>;
}

/// Persists reports under projects.
pub trait ReportWorkspace: Send + Sync {
    fn add_report(&self, project: &ProjectId, report: &DriftReport) -> MonitorResult<()>;
    fn search_project(&self, name: &str) -> MonitorResult<Vec<Project>>;
    fn create_project(&self, name: &str, description: &str) -> MonitorResult<Project>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_report_pairs_drift_and_summary_per_column() {
        let report = income_drift_report();
        assert_eq!(report.metrics.len(), 2 + 2 * INCOME_DRIFT_COLUMNS.len());
        assert_eq!(report.metrics[0], MetricSpec::DatasetDrift);
        assert_eq!(
            report.metrics[2],
            MetricSpec::ColumnDrift {
                column: "Education".into()
            }
        );
        assert!(report.timestamp.is_none());
    }

    #[test]
    fn fresh_copy_has_new_id_and_no_results() {
        let mut report = income_drift_report();
        report.timestamp = Some(Utc::now());
        report.current_rows = 3;
        let fresh = report.fresh();
        assert_ne!(fresh.id, report.id);
        assert_eq!(fresh.metrics, report.metrics);
        assert!(fresh.timestamp.is_none());
        assert_eq!(fresh.current_rows, 0);
    }

    #[test]
    fn metric_specs_serialize_with_type_tag() {
        let json = serde_json::to_value(MetricSpec::ColumnSummary {
            column: "Sex".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"type": "column_summary", "column": "Sex"}));
    }
}
