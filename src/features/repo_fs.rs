//! Materialised feature tables served as a [`FeatureStore`].
//!
//! Each feature view is a CSV file `<view>.csv` keyed by `user_id`. Keys are
//! compared as text, so `0042` and `42` are different entities. When a key
//! appears more than once the last row wins. There is no TTL or point-in-time
//! logic here; that stays with the real store.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::common::error::{MonitorError, MonitorResult};
use crate::data::domain::{Frame, Value};
use crate::data::service::read_csv_keeping_text;

use super::domain::{FeatureRef, FeatureStore, ENTITY_KEY};

struct ViewTable {
    frame: Frame,
    by_key: HashMap<String, usize>,
}

impl ViewTable {
    fn index(view: &str, frame: Frame) -> MonitorResult<Self> {
        let key_idx = frame.column_index(ENTITY_KEY).ok_or_else(|| {
            MonitorError::invalid(format!("feature view '{view}' has no {ENTITY_KEY} column"))
        })?;
        let by_key = frame
            .rows()
            .iter()
            .enumerate()
            .map(|(idx, row)| (row[key_idx].to_string(), idx))
            .collect();
        Ok(Self { frame, by_key })
    }

    fn lookup(&self, key: &Value, field: &str) -> MonitorResult<Value> {
        let col = self
            .frame
            .column_index(field)
            .ok_or_else(|| MonitorError::invalid(format!("unknown feature field '{field}'")))?;
        Ok(self
            .by_key
            .get(&key.to_string())
            .map(|&row| self.frame.rows()[row][col].clone())
            .unwrap_or(Value::Missing))
    }
}

/// Lookup adapter over per-view tables.
pub struct TableFeatureStore {
    views: HashMap<String, ViewTable>,
}

impl TableFeatureStore {
    pub fn from_tables(tables: HashMap<String, Frame>) -> MonitorResult<Self> {
        let views = tables
            .into_iter()
            .map(|(view, frame)| {
                let table = ViewTable::index(&view, frame)?;
                Ok((view, table))
            })
            .collect::<MonitorResult<HashMap<_, _>>>()?;
        Ok(Self { views })
    }

    /// Load every `*.csv` under `dir` as a view named after the file stem.
    pub fn open(dir: impl AsRef<Path>) -> MonitorResult<Self> {
        let dir = dir.as_ref();
        let mut tables = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(view) = path.file_stem().and_then(|s| s.to_str()) {
                tables.insert(view.to_string(), read_csv_keeping_text(&path, &[ENTITY_KEY])?);
            }
        }
        tracing::info!(views = tables.len(), dir = %dir.display(), "feature tables loaded");
        Self::from_tables(tables)
    }

    fn view(&self, r: &FeatureRef) -> MonitorResult<&ViewTable> {
        self.views
            .get(&r.view)
            .ok_or_else(|| MonitorError::invalid(format!("unknown feature view '{}'", r.view)))
    }

    fn features_for(&self, key: &Value, refs: &[FeatureRef]) -> MonitorResult<Vec<Value>> {
        refs.iter()
            .map(|r| self.view(r)?.lookup(key, &r.field))
            .collect()
    }
}

impl FeatureStore for TableFeatureStore {
    fn online_features(&self, refs: &[FeatureRef], entity_keys: &[Value]) -> MonitorResult<Frame> {
        let mut columns = vec![ENTITY_KEY.to_string()];
        columns.extend(refs.iter().map(|r| r.field.clone()));
        let mut frame = Frame::from_rows(columns, Vec::with_capacity(entity_keys.len()))?;
        for key in entity_keys {
            let mut row = vec![key.clone()];
            row.extend(self.features_for(key, refs)?);
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    fn historical_features(&self, entities: &Frame, refs: &[FeatureRef]) -> MonitorResult<Frame> {
        let key_idx = entities.column_index(ENTITY_KEY).ok_or_else(|| {
            MonitorError::invalid(format!("entity frame has no {ENTITY_KEY} column"))
        })?;
        let mut columns = entities.columns().to_vec();
        columns.extend(refs.iter().map(|r| r.field.clone()));
        let mut frame = Frame::from_rows(columns, Vec::with_capacity(entities.len()))?;
        for entity in entities.rows() {
            let mut row = entity.clone();
            row.extend(self.features_for(&entity[key_idx], refs)?);
            frame.push_row(row)?;
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TableFeatureStore {
        let demographic = Frame::from_rows(
            vec!["user_id".into(), "Sex".into(), "Race".into()],
            vec![
                vec![1i64.into(), "Male".into(), "White".into()],
                vec![2i64.into(), "Female".into(), "Black".into()],
                vec![1i64.into(), "Female".into(), "White".into()],
            ],
        )
        .unwrap();
        let occupation = Frame::from_rows(
            vec!["user_id".into(), "Education".into()],
            vec![vec![2i64.into(), "Masters".into()]],
        )
        .unwrap();
        TableFeatureStore::from_tables(HashMap::from([
            ("demographic".to_string(), demographic),
            ("occupation".to_string(), occupation),
        ]))
        .unwrap()
    }

    fn refs() -> Vec<FeatureRef> {
        vec![
            FeatureRef::new("demographic", "Sex"),
            FeatureRef::new("occupation", "Education"),
        ]
    }

    #[test]
    fn online_lookup_uses_latest_row_and_fills_missing() {
        let frame = store()
            .online_features(&refs(), &[Value::from(1i64), Value::from(2i64)])
            .unwrap();
        assert_eq!(frame.columns(), ["user_id", "Sex", "Education"]);
        assert_eq!(frame.rows()[0][1], Value::from("Female"));
        assert_eq!(frame.rows()[0][2], Value::Missing);
        assert_eq!(frame.rows()[1][2], Value::from("Masters"));
    }

    #[test]
    fn unknown_entity_yields_missing_features() {
        let frame = store().online_features(&refs(), &[Value::from(99i64)]).unwrap();
        assert_eq!(frame.rows()[0][1..], [Value::Missing, Value::Missing]);
    }

    #[test]
    fn unknown_view_is_invalid_input() {
        let err = store()
            .online_features(&[FeatureRef::new("nope", "x")], &[Value::from(1i64)])
            .unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::InvalidInput);
    }

    #[test]
    fn historical_keeps_entity_columns() {
        let entities = Frame::from_rows(
            vec!["user_id".into(), "event_timestamp".into()],
            vec![vec![2i64.into(), "2024-01-01T00:00:00Z".into()]],
        )
        .unwrap();
        let frame = store().historical_features(&entities, &refs()).unwrap();
        assert_eq!(frame.columns(), ["user_id", "event_timestamp", "Sex", "Education"]);
        assert_eq!(frame.rows()[0][2], Value::from("Female"));
    }

    #[test]
    fn open_reads_csv_views() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("demographic.csv"), "user_id,Sex\n5,Male\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let store = TableFeatureStore::open(dir.path()).unwrap();
        let frame = store
            .online_features(&[FeatureRef::new("demographic", "Sex")], &[Value::from(5i64)])
            .unwrap();
        assert_eq!(frame.rows()[0][1], Value::from("Male"));
    }

    #[test]
    fn csv_keys_are_matched_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("demographic.csv"),
            "user_id,Sex\n0042,Female\n42,Male\n",
        )
        .unwrap();
        let store = TableFeatureStore::open(dir.path()).unwrap();
        let refs = [FeatureRef::new("demographic", "Sex")];

        let frame = store
            .online_features(&refs, &[Value::from("0042"), Value::from(42i64)])
            .unwrap();
        assert_eq!(frame.rows()[0], vec![Value::from("0042"), Value::from("Female")]);
        assert_eq!(frame.rows()[1][1], Value::from("Male"));
    }
}
