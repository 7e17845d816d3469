//! Reading and writing tabular artefacts.
//!
//! Pipeline steps exchange CSV files with a header row; empty fields are
//! read back as missing values. Key columns can be kept verbatim so that
//! identifiers such as `0042` survive the round trip.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::common::error::{MonitorError, MonitorResult};

use super::domain::{Frame, Value};

/// Load a CSV file with a header row.
pub fn read_csv(path: impl AsRef<Path>) -> MonitorResult<Frame> {
    read_csv_keeping_text(path, &[])
}

/// Like [`read_csv`], but cells in `text_columns` are never parsed as numbers.
pub fn read_csv_keeping_text(path: impl AsRef<Path>, text_columns: &[&str]) -> MonitorResult<Frame> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| MonitorError::dependency(format!("open {}: {e}", path.display())))?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let verbatim: Vec<bool> = columns
        .iter()
        .map(|c| text_columns.contains(&c.as_str()))
        .collect();
    let mut frame = Frame::from_rows(columns, Vec::new())?;
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .zip(&verbatim)
            .map(|(raw, &keep)| match keep {
                true if !raw.is_empty() => Value::Text(raw.to_string()),
                _ => Value::parse(raw),
            })
            .collect();
        frame.push_row(row)?;
    }
    Ok(frame)
}

/// Write a frame as CSV, creating parent directories.
pub fn write_csv(frame: &Frame, path: impl AsRef<Path>) -> MonitorResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(frame.columns())?;
    for row in frame.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trip_keeps_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/features.csv");
        let frame = Frame::from_rows(
            vec!["user_id".into(), "Sex".into(), "Age".into()],
            vec![
                vec![1i64.into(), "Male".into(), 39.5.into()],
                vec![2i64.into(), Value::Missing, 50.0.into()],
            ],
        )
        .unwrap();

        write_csv(&frame, &path).unwrap();
        let loaded = read_csv(&path).unwrap();

        assert_eq!(loaded.columns(), frame.columns());
        assert_eq!(loaded.rows()[1][1], Value::Missing);
        assert_eq!(loaded.rows()[0][2], Value::Number(39.5));
    }

    #[test]
    fn text_columns_keep_leading_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity_df.csv");
        fs::write(&path, "user_id,Age\n0042,39\n,40\n").unwrap();

        let loaded = read_csv_keeping_text(&path, &["user_id"]).unwrap();
        assert_eq!(loaded.rows()[0][0], Value::from("0042"));
        assert_eq!(loaded.rows()[0][1], Value::Number(39.0));
        assert_eq!(loaded.rows()[1][0], Value::Missing);

        let parsed = read_csv(&path).unwrap();
        assert_eq!(parsed.rows()[0][0], Value::Number(42.0));
    }

    #[test]
    fn missing_file_is_a_dependency_failure() {
        let err = read_csv("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::Dependency);
    }
}
