//! Core tabular definitions shared by the serving path and the pipeline.
//!
//! A [`Frame`] is an ordered list of column names plus row-major values. It
//! carries only what the monitor and the normalizer need; anything heavier
//! belongs to the external stores.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::{MonitorError, MonitorResult};

/// A single scalar cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view; text that parses as a float is accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(text) => text.trim().parse().ok(),
            Value::Missing => None,
        }
    }

    /// Interpret a raw text field: empty is missing, floats become numbers.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Missing
        } else if let Ok(n) = trimmed.parse::<f64>() {
            Value::Number(n)
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    /// Convert a JSON scalar; nested values are rejected.
    pub fn from_json(value: &serde_json::Value) -> MonitorResult<Self> {
        match value {
            serde_json::Value::Null => Ok(Value::Missing),
            serde_json::Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| MonitorError::invalid(format!("number out of range: {n}"))),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            other => Err(MonitorError::invalid(format!(
                "expected a scalar feature value, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(text) => f.write_str(text),
            Value::Missing => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

/// Named columns with row-major values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// An empty frame with the given columns.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a frame, rejecting duplicate columns and ragged rows.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> MonitorResult<Self> {
        let mut seen = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if seen.insert(name.as_str(), idx).is_some() {
                return Err(MonitorError::invalid(format!("duplicate column '{name}'")));
            }
        }
        let mut frame = Self {
            columns,
            rows: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate one column's values.
    pub fn column(&self, name: &str) -> MonitorResult<impl Iterator<Item = &Value> + '_> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| MonitorError::invalid(format!("unknown column '{name}'")))?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> MonitorResult<()> {
        if row.len() != self.columns.len() {
            return Err(MonitorError::invalid(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append `other` below `self`. Columns are unioned in first-seen order and
    /// cells a side does not have become `Missing`.
    pub fn append(&mut self, other: &Frame) {
        let mut mapping = Vec::with_capacity(other.columns.len());
        for name in &other.columns {
            let idx = match self.column_index(name) {
                Some(idx) => idx,
                None => {
                    self.columns.push(name.clone());
                    for row in &mut self.rows {
                        row.push(Value::Missing);
                    }
                    self.columns.len() - 1
                }
            };
            mapping.push(idx);
        }
        let width = self.columns.len();
        for src in &other.rows {
            let mut row = vec![Value::Missing; width];
            for (value, &idx) in src.iter().zip(&mapping) {
                row[idx] = value.clone();
            }
            self.rows.push(row);
        }
    }

    /// Retain only the most recent `n` rows.
    pub fn keep_last(&mut self, n: usize) {
        if self.rows.len() > n {
            let excess = self.rows.len() - n;
            self.rows.drain(..excess);
        }
    }

    /// Drop columns, failing if any of them is absent.
    pub fn drop_columns(&mut self, names: &[&str]) -> MonitorResult<()> {
        if let Some(missing) = names.iter().find(|n| self.column_index(n).is_none()) {
            return Err(MonitorError::invalid(format!(
                "cannot drop unknown column '{missing}'"
            )));
        }
        self.drop_columns_if_present(names);
        Ok(())
    }

    /// Drop whichever of `names` exist.
    pub fn drop_columns_if_present(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Add or replace a column.
    pub fn with_column(&mut self, name: &str, values: Vec<Value>) -> MonitorResult<()> {
        if values.len() != self.rows.len() {
            return Err(MonitorError::invalid(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> Frame {
        Frame::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn append_unions_columns_and_fills_missing() {
        let mut left = frame(&["Sex"], vec![vec!["Male".into()]]);
        let right = frame(&["Race", "Sex"], vec![vec!["White".into(), "Female".into()]]);
        left.append(&right);

        assert_eq!(left.columns(), ["Sex", "Race"]);
        assert_eq!(left.rows()[0], vec![Value::from("Male"), Value::Missing]);
        assert_eq!(left.rows()[1], vec![Value::from("Female"), Value::from("White")]);
    }

    #[test]
    fn append_into_empty_frame_takes_columns() {
        let mut window = Frame::default();
        window.append(&frame(&["a", "b"], vec![vec![1.0.into(), 2.0.into()]]));
        assert_eq!(window.columns(), ["a", "b"]);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn keep_last_drops_oldest_rows() {
        let mut f = frame(
            &["id"],
            (0..5).map(|i| vec![Value::from(i as i64)]).collect(),
        );
        f.keep_last(2);
        assert_eq!(f.rows(), &[vec![Value::from(3i64)], vec![Value::from(4i64)]]);
        f.keep_last(10);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn strict_drop_rejects_unknown_columns() {
        let mut f = frame(&["user_id", "Sex"], vec![vec![1i64.into(), "Male".into()]]);
        assert!(f.drop_columns(&["event_timestamp"]).is_err());
        assert_eq!(f.columns().len(), 2);

        f.drop_columns_if_present(&["event_timestamp", "user_id"]);
        assert_eq!(f.columns(), ["Sex"]);
        assert_eq!(f.rows()[0], vec![Value::from("Male")]);
    }

    #[test]
    fn ragged_rows_and_duplicate_columns_are_rejected() {
        assert!(Frame::from_rows(vec!["a".into()], vec![vec![]]).is_err());
        assert!(Frame::from_rows(vec!["a".into(), "a".into()], vec![]).is_err());
    }

    #[test]
    fn value_parse_classifies_fields() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse(" 39 "), Value::Number(39.0));
        assert_eq!(Value::parse("Bachelors"), Value::from("Bachelors"));
    }
}
