//! Domain definitions for model inputs, outputs and the classifier contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::common::error::{MonitorError, MonitorResult};

/// Ordered one-hot column names a model was fitted on. Immutable once loaded.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnList(Vec<String>);

impl ColumnList {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Dense row-major numeric matrix with named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    columns: Vec<String>,
    n_rows: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(columns: Vec<String>, n_rows: usize, data: Vec<f64>) -> MonitorResult<Self> {
        if data.len() != n_rows * columns.len() {
            return Err(MonitorError::invalid(format!(
                "{} values do not fill {n_rows} rows of width {}",
                data.len(),
                columns.len()
            )));
        }
        Ok(Self {
            columns,
            n_rows,
            data,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let width = self.columns.len();
        &self.data[idx * width..(idx + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |idx| self.row(idx))
    }

    /// Value at `(row, column name)`, if the column exists.
    pub fn get(&self, row: usize, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(row).get(col).copied()
    }
}

/// Trained model operating on normalized matrices.
pub trait Classifier: Send + Sync {
    /// One class id per row.
    fn predict(&self, input: &Matrix) -> MonitorResult<Vec<i64>>;
    /// Probability of the positive class per row.
    fn predict_proba(&self, input: &Matrix) -> MonitorResult<Vec<f64>>;
}

/// Logistic scorer over named weights; the export format of registry models.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for LinearModel {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            bias: 0.0,
            threshold: default_threshold(),
        }
    }
}

impl LinearModel {
    fn score(&self, input: &Matrix) -> Vec<f64> {
        let weights: Vec<f64> = input
            .columns()
            .iter()
            .map(|c| self.weights.get(c).copied().unwrap_or(0.0))
            .collect();
        input
            .rows()
            .map(|row| {
                let z = self.bias
                    + row
                        .iter()
                        .zip(&weights)
                        .map(|(x, w)| if x.is_nan() { 0.0 } else { x * w })
                        .sum::<f64>();
                1.0 / (1.0 + (-z).exp())
            })
            .collect()
    }
}

impl Classifier for LinearModel {
    fn predict(&self, input: &Matrix) -> MonitorResult<Vec<i64>> {
        Ok(self
            .score(input)
            .into_iter()
            .map(|p| i64::from(p >= self.threshold))
            .collect())
    }

    fn predict_proba(&self, input: &Matrix) -> MonitorResult<Vec<f64>> {
        Ok(self.score(input))
    }
}

/// Income bands the classifier predicts.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IncomeBand {
    AtMost50K,
    Above50K,
}

impl IncomeBand {
    /// Map a class id; ids outside the table have no band.
    pub fn from_class_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(IncomeBand::AtMost50K),
            1 => Some(IncomeBand::Above50K),
            _ => None,
        }
    }

    /// Display label. `Above50K` keeps the lowercase `k` clients already parse.
    pub fn label(&self) -> &'static str {
        match self {
            IncomeBand::AtMost50K => "<=50K",
            IncomeBand::Above50K => ">50k",
        }
    }
}

/// Decode a raw class id into its display label.
pub fn decode_prediction(id: i64) -> Option<&'static str> {
    IncomeBand::from_class_id(id).map(|band| band.label())
}
