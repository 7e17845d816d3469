//! Local report engine.
//!
//! Fills the descriptive metrics (missing values, column summaries). Drift
//! metrics need statistical tests owned by the external report service and are
//! recorded as not computed.

use std::collections::HashMap;

use serde_json::json;

use crate::common::error::{MonitorError, MonitorResult};
use crate::data::domain::{Frame, Value};

use super::domain::{DriftEngine, DriftReport, MetricResult, MetricSpec, MetricStatus};

const TOP_VALUES: usize = 5;

#[derive(Clone, Debug, Default)]
pub struct ProfileEngine;

impl ProfileEngine {
    pub fn new() -> Self {
        Self
    }
}

fn missing_values(frame: &Frame) -> serde_json::Value {
    let cells = frame.len() * frame.columns().len();
    let missing = frame
        .rows()
        .iter()
        .flatten()
        .filter(|v| v.is_missing())
        .count();
    let share = if cells == 0 {
        0.0
    } else {
        missing as f64 / cells as f64
    };
    json!({ "cells": cells, "missing": missing, "share": share })
}

fn column_summary(frame: &Frame, column: &str) -> MonitorResult<serde_json::Value> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut missing = 0usize;
    let mut numbers = Vec::new();
    for value in frame.column(column)? {
        match value {
            Value::Missing => missing += 1,
            Value::Number(n) => {
                numbers.push(*n);
                *counts.entry(value.to_string()).or_default() += 1;
            }
            Value::Text(_) => *counts.entry(value.to_string()).or_default() += 1,
        }
    }

    let mut top: Vec<(String, usize)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_VALUES);

    let mut summary = json!({
        "count": frame.len(),
        "missing": missing,
        "unique": counts.len(),
        "top": top,
    });
    if !numbers.is_empty() && numbers.len() == frame.len() - missing {
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
        let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        summary["mean"] = json!(mean);
        summary["min"] = json!(min);
        summary["max"] = json!(max);
    }
    Ok(summary)
}

fn require_column(frame: &Frame, side: &str, column: &str) -> MonitorResult<()> {
    if frame.column_index(column).is_none() {
        return Err(MonitorError::invalid(format!(
            "column '{column}' is missing from the {side} dataset"
        )));
    }
    Ok(())
}

impl DriftEngine for ProfileEngine {
    fn run(&self, report: &mut DriftReport, reference: &Frame, current: &Frame) -> MonitorResult<()> {
        let mut results = Vec::with_capacity(report.metrics.len());
        for metric in &report.metrics {
            let (status, value) = match metric {
                MetricSpec::DatasetMissingValues => (
                    MetricStatus::Computed,
                    json!({
                        "reference": missing_values(reference),
                        "current": missing_values(current),
                    }),
                ),
                MetricSpec::ColumnSummary { column } => (
                    MetricStatus::Computed,
                    json!({
                        "reference": column_summary(reference, column)?,
                        "current": column_summary(current, column)?,
                    }),
                ),
                MetricSpec::ColumnDrift { column } => {
                    require_column(reference, "reference", column)?;
                    require_column(current, "current", column)?;
                    (MetricStatus::NotComputed, serde_json::Value::Null)
                }
                MetricSpec::DatasetDrift => (MetricStatus::NotComputed, serde_json::Value::Null),
            };
            results.push(MetricResult {
                metric: metric.clone(),
                status,
                value,
            });
        }
        report.results = results;
        report.reference_rows = reference.len();
        report.current_rows = current.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: Vec<Vec<Value>>) -> Frame {
        Frame::from_rows(vec!["Sex".into(), "Age".into()], rows).unwrap()
    }

    #[test]
    fn fills_summaries_and_marks_drift_not_computed() {
        let reference = frame(vec![
            vec!["Male".into(), 30.0.into()],
            vec!["Female".into(), 50.0.into()],
            vec!["Male".into(), Value::Missing],
        ]);
        let current = frame(vec![vec!["Female".into(), 40.0.into()]]);
        let mut report = DriftReport::new(vec![
            MetricSpec::DatasetDrift,
            MetricSpec::DatasetMissingValues,
            MetricSpec::ColumnSummary { column: "Sex".into() },
            MetricSpec::ColumnSummary { column: "Age".into() },
        ]);

        ProfileEngine::new().run(&mut report, &reference, &current).unwrap();

        assert_eq!(report.results.len(), 4);
        assert_eq!(report.results[0].status, MetricStatus::NotComputed);
        assert_eq!(report.results[1].value["reference"]["missing"], json!(1));
        assert_eq!(report.results[2].value["reference"]["top"][0], json!(["Male", 2]));
        assert_eq!(report.results[3].value["reference"]["mean"], json!(40.0));
        assert_eq!(report.reference_rows, 3);
        assert_eq!(report.current_rows, 1);
    }

    #[test]
    fn missing_column_fails_the_run() {
        let reference = frame(vec![vec!["Male".into(), 30.0.into()]]);
        let current = Frame::from_rows(vec!["Age".into()], vec![vec![1.0.into()]]).unwrap();
        let mut report = DriftReport::new(vec![MetricSpec::ColumnDrift { column: "Sex".into() }]);
        let err = ProfileEngine::new()
            .run(&mut report, &reference, &current)
            .unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::InvalidInput);
    }
}
