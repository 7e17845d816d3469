//! Schema normalization: raw feature rows to the fitted one-hot column space.
//!
//! Categorical columns (any text value) are one-hot encoded with their levels
//! sorted alphabetically and the first level dropped. Numeric columns pass
//! through as `f64`, missing numbers become `NaN`. The encoded result is then
//! reindexed onto the fitted column list: absent columns are filled with
//! `0.0`, unknown ones are dropped, order follows the list.
//!
//! Levels are taken from the batch being encoded. A level whose indicator is
//! not in the fitted list vanishes on reindex, so an unseen category looks
//! exactly like the baseline level of that column. A single-row batch has one
//! level per column, which is always the dropped one.

use std::collections::{BTreeSet, HashMap};

use crate::common::error::{MonitorError, MonitorResult};
use crate::data::domain::{Frame, Value};

use super::domain::{ColumnList, Matrix};

type Column = (String, Vec<f64>);

fn is_categorical(frame: &Frame, col: usize) -> bool {
    frame
        .rows()
        .iter()
        .any(|row| matches!(row[col], Value::Text(_)))
}

fn numeric_column(frame: &Frame, col: usize) -> Column {
    let values = frame
        .rows()
        .iter()
        .map(|row| row[col].as_f64().unwrap_or(f64::NAN))
        .collect();
    (frame.columns()[col].clone(), values)
}

fn indicator_columns(frame: &Frame, col: usize) -> Vec<Column> {
    let name = &frame.columns()[col];
    let cells: Vec<Option<String>> = frame
        .rows()
        .iter()
        .map(|row| (!row[col].is_missing()).then(|| row[col].to_string()))
        .collect();
    let levels: BTreeSet<&str> = cells.iter().flatten().map(String::as_str).collect();

    levels
        .into_iter()
        .skip(1)
        .map(|level| {
            let values = cells
                .iter()
                .map(|cell| match cell {
                    Some(v) if v == level => 1.0,
                    _ => 0.0,
                })
                .collect();
            (format!("{name}_{level}"), values)
        })
        .collect()
}

/// One-hot encode a batch. Numeric columns come first, indicator columns
/// follow in source column order.
pub fn one_hot(frame: &Frame) -> MonitorResult<Matrix> {
    if frame.is_empty() || frame.columns().is_empty() {
        return Err(MonitorError::invalid(
            "cannot encode a batch without rows or columns",
        ));
    }

    let mut numeric = Vec::new();
    let mut indicators = Vec::new();
    for col in 0..frame.columns().len() {
        if is_categorical(frame, col) {
            indicators.extend(indicator_columns(frame, col));
        } else {
            numeric.push(numeric_column(frame, col));
        }
    }
    numeric.extend(indicators);

    let n_rows = frame.len();
    let mut data = Vec::with_capacity(n_rows * numeric.len());
    for row in 0..n_rows {
        data.extend(numeric.iter().map(|(_, values)| values[row]));
    }
    let columns = numeric.into_iter().map(|(name, _)| name).collect();
    Matrix::new(columns, n_rows, data)
}

/// Project an encoded batch onto `fitted`: missing columns become `0.0`,
/// extra columns are dropped, order follows `fitted`.
pub fn reindex(encoded: &Matrix, fitted: &ColumnList) -> MonitorResult<Matrix> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(encoded.columns().len());
    for (idx, name) in encoded.columns().iter().enumerate() {
        positions.entry(name.as_str()).or_insert(idx);
    }
    let sources: Vec<Option<usize>> = fitted
        .as_slice()
        .iter()
        .map(|name| positions.get(name.as_str()).copied())
        .collect();

    let mut data = Vec::with_capacity(encoded.n_rows() * sources.len());
    for row in encoded.rows() {
        data.extend(sources.iter().map(|src| src.map_or(0.0, |idx| row[idx])));
    }
    Matrix::new(fitted.as_slice().to_vec(), encoded.n_rows(), data)
}

/// Convert a batch of feature rows into the model's input matrix.
pub fn normalize(frame: &Frame, fitted: &ColumnList) -> MonitorResult<Matrix> {
    if fitted.is_empty() {
        return Err(MonitorError::invalid("fitted column list is empty"));
    }
    let encoded = one_hot(frame)?;
    let dropped = encoded
        .columns()
        .iter()
        .filter(|c| !fitted.as_slice().contains(*c))
        .count();
    if dropped > 0 {
        tracing::debug!(dropped, "encoded columns outside the fitted list were dropped");
    }
    reindex(&encoded, fitted)
}
