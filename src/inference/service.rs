//! Inference orchestration: the per-request serving path and batch scoring.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::common::error::{MonitorError, MonitorResult};
use crate::common::log::log_event;
use crate::data::domain::{Frame, Value};
use crate::evaluation::service::SharedMonitor;
use crate::features::{FeatureRef, FeatureStore, ENTITY_KEY, EVENT_TIMESTAMP};

use super::domain::{decode_prediction, Classifier, ColumnList};
use super::encode::normalize;

/// Column appended by batch scoring.
pub const PREDICTION_COLUMN: &str = "Predicted_Income_Class";

/// The entity key is kept as sent and echoed back unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub user_id: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// `None` when the model returned a class outside the label table.
    pub income_category: Option<String>,
    pub user_id: serde_json::Value,
}

/// Everything a request needs, built once at startup and shared.
pub struct Predictor {
    store: Arc<dyn FeatureStore>,
    model: Arc<dyn Classifier>,
    columns: ColumnList,
    features: Vec<FeatureRef>,
    monitor: Option<SharedMonitor>,
}

impl fmt::Debug for Predictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predictor")
            .field("columns", &self.columns)
            .field("features", &self.features)
            .field("monitored", &self.monitor.is_some())
            .finish_non_exhaustive()
    }
}

impl Predictor {
    pub fn new(
        store: Arc<dyn FeatureStore>,
        model: Arc<dyn Classifier>,
        columns: ColumnList,
        features: Vec<FeatureRef>,
    ) -> Self {
        Self {
            store,
            model,
            columns,
            features,
            monitor: None,
        }
    }

    /// Feed every request's features into the drift accumulator.
    pub fn with_monitor(mut self, monitor: SharedMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn monitor(&self) -> Option<&SharedMonitor> {
        self.monitor.as_ref()
    }

    /// Fetch features, feed the monitor, normalize, predict and decode.
    pub fn predict(&self, request: &PredictRequest) -> MonitorResult<PredictResponse> {
        let start = Instant::now();
        let key = Value::from_json(&request.user_id)?;
        let mut features = self
            .store
            .online_features(&self.features, std::slice::from_ref(&key))?;
        features.drop_columns(&[ENTITY_KEY])?;

        if let Some(monitor) = &self.monitor {
            monitor.iterate(&features)?;
        }

        let input = normalize(&features, &self.columns)?;
        let class_id = self
            .model
            .predict(&input)?
            .into_iter()
            .next()
            .ok_or_else(|| MonitorError::internal("model returned no prediction"))?;

        let income_category = decode_prediction(class_id).map(str::to_string);
        if income_category.is_none() {
            tracing::warn!(class_id, "prediction has no label");
        }
        log_event("inference", "predict", 0, start.elapsed().as_millis() as i64);
        Ok(PredictResponse {
            income_category,
            user_id: request.user_id.clone(),
        })
    }
}

/// Score a batch of retrieved features: the normalized matrix plus the
/// positive-class probability in [`PREDICTION_COLUMN`].
pub fn score_frame(
    model: &dyn Classifier,
    features: &Frame,
    columns: &ColumnList,
) -> MonitorResult<Frame> {
    let mut features = features.clone();
    features.drop_columns(&[ENTITY_KEY, EVENT_TIMESTAMP])?;

    let input = normalize(&features, columns)?;
    let proba = model.predict_proba(&input)?;
    if proba.len() != input.n_rows() {
        return Err(MonitorError::internal(format!(
            "model scored {} of {} rows",
            proba.len(),
            input.n_rows()
        )));
    }

    let rows = input
        .rows()
        .map(|row| row.iter().map(|v| Value::Number(*v)).collect())
        .collect();
    let mut scored = Frame::from_rows(input.columns().to_vec(), rows)?;
    scored.with_column(PREDICTION_COLUMN, proba.into_iter().map(Value::Number).collect())?;
    tracing::info!(rows = scored.len(), "batch scored");
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::evaluation::domain::{DriftEngine, DriftReport, Project, ProjectId, ReportWorkspace};
    use crate::evaluation::service::MonitoringService;
    use crate::features::TableFeatureStore;
    use crate::inference::domain::{LinearModel, Matrix};

    struct FixedClass(i64);

    impl Classifier for FixedClass {
        fn predict(&self, input: &Matrix) -> MonitorResult<Vec<i64>> {
            Ok(vec![self.0; input.n_rows()])
        }

        fn predict_proba(&self, input: &Matrix) -> MonitorResult<Vec<f64>> {
            Ok(vec![self.0 as f64; input.n_rows()])
        }
    }

    struct CountingEngine(Mutex<usize>);

    impl DriftEngine for CountingEngine {
        fn run(&self, _: &mut DriftReport, _: &Frame, _: &Frame) -> MonitorResult<()> {
            *self.0.lock() += 1;
            Ok(())
        }
    }

    struct NullWorkspace;

    impl ReportWorkspace for NullWorkspace {
        fn add_report(&self, _: &ProjectId, _: &DriftReport) -> MonitorResult<()> {
            Ok(())
        }

        fn search_project(&self, _: &str) -> MonitorResult<Vec<Project>> {
            Ok(Vec::new())
        }

        fn create_project(&self, _: &str, _: &str) -> MonitorResult<Project> {
            Err(MonitorError::internal("unused"))
        }
    }

    fn store() -> Arc<dyn FeatureStore> {
        let demographic = Frame::from_rows(
            vec!["user_id".into(), "Sex".into(), "Race".into()],
            vec![
                vec![1i64.into(), "Male".into(), "White".into()],
                vec![2i64.into(), "Female".into(), "Black".into()],
            ],
        )
        .unwrap();
        Arc::new(
            TableFeatureStore::from_tables(HashMap::from([("demographic".to_string(), demographic)]))
                .unwrap(),
        )
    }

    fn refs() -> Vec<FeatureRef> {
        vec![
            FeatureRef::new("demographic", "Sex"),
            FeatureRef::new("demographic", "Race"),
        ]
    }

    fn columns() -> ColumnList {
        ColumnList::new(["Sex_Male", "Race_White"])
    }

    #[test]
    fn predict_decodes_label_and_echoes_user() {
        let predictor = Predictor::new(store(), Arc::new(FixedClass(1)), columns(), refs());
        let response = predictor
            .predict(&PredictRequest {
                user_id: json!(1),
            })
            .unwrap();
        assert_eq!(response.income_category.as_deref(), Some(">50k"));
        assert_eq!(response.user_id, json!(1));
    }

    #[test]
    fn unknown_class_yields_no_category() {
        let predictor = Predictor::new(store(), Arc::new(FixedClass(7)), columns(), refs());
        let response = predictor
            .predict(&PredictRequest {
                user_id: json!(2),
            })
            .unwrap();
        assert_eq!(response.income_category, None);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, json!({"income_category": null, "user_id": 2}));
    }

    #[test]
    fn text_keys_are_looked_up_and_echoed_verbatim() {
        let demographic = Frame::from_rows(
            vec!["user_id".into(), "Sex".into(), "Race".into()],
            vec![vec!["0042".into(), "Male".into(), "White".into()]],
        )
        .unwrap();
        let store = TableFeatureStore::from_tables(HashMap::from([(
            "demographic".to_string(),
            demographic,
        )]))
        .unwrap();
        let model = LinearModel {
            weights: HashMap::from([("Sex_Male".to_string(), 3.0)]),
            bias: 0.0,
            threshold: 0.5,
        };
        let predictor = Predictor::new(Arc::new(store), Arc::new(model), columns(), refs());

        let response = predictor
            .predict(&PredictRequest {
                user_id: json!("0042"),
            })
            .unwrap();
        assert_eq!(response.income_category.as_deref(), Some(">50k"));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"income_category": ">50k", "user_id": "0042"})
        );
    }

    #[test]
    fn nested_user_id_is_rejected() {
        let predictor = Predictor::new(store(), Arc::new(FixedClass(1)), columns(), refs());
        let err = predictor
            .predict(&PredictRequest {
                user_id: json!({"id": 1}),
            })
            .unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::InvalidInput);
    }

    #[test]
    fn debug_output_names_wiring_without_collaborators() {
        let predictor = Predictor::new(store(), Arc::new(FixedClass(1)), columns(), refs());
        let rendered = format!("{predictor:?}");
        assert!(rendered.starts_with("Predictor {"));
        assert!(rendered.contains("monitored: false"));
        assert!(rendered.contains("Sex_Male"));
        assert!(rendered.ends_with(".. }"));
    }

    #[test]
    fn requests_feed_the_monitor_without_entity_key() {
        let engine = Arc::new(CountingEngine(Mutex::new(0)));
        let monitor = SharedMonitor::new(
            MonitoringService::new(
                DriftReport::new(Vec::new()),
                Arc::new(Frame::default()),
                engine.clone(),
                Arc::new(NullWorkspace),
                ProjectId::new("income"),
                2,
            )
            .unwrap(),
        );
        let predictor = Predictor::new(store(), Arc::new(FixedClass(0)), columns(), refs())
            .with_monitor(monitor.clone());

        for id in [1i64, 2, 1] {
            predictor
                .predict(&PredictRequest {
                    user_id: json!(id),
                })
                .unwrap();
        }
        monitor.inspect(|svc| {
            assert_eq!(svc.current().columns(), ["Sex", "Race"]);
            assert_eq!(svc.new_rows_seen(), 3);
        });
        assert_eq!(*engine.0.lock(), 2);
    }

    #[test]
    fn score_frame_appends_probability_column() {
        let features = Frame::from_rows(
            vec![
                "user_id".into(),
                "event_timestamp".into(),
                "Sex".into(),
                "Race".into(),
            ],
            vec![
                vec![1i64.into(), "2024-01-01".into(), "Male".into(), "White".into()],
                vec![2i64.into(), "2024-01-01".into(), "Female".into(), "Black".into()],
            ],
        )
        .unwrap();
        let model = LinearModel {
            weights: HashMap::from([("Sex_Male".to_string(), 3.0)]),
            bias: 0.0,
            threshold: 0.5,
        };

        let scored = score_frame(&model, &features, &columns()).unwrap();
        assert_eq!(scored.columns(), ["Sex_Male", "Race_White", PREDICTION_COLUMN]);
        let p_male = scored.rows()[0][2].as_f64().unwrap();
        let p_female = scored.rows()[1][2].as_f64().unwrap();
        assert!(p_male > 0.9);
        assert!((p_female - 0.5).abs() < 1e-9);
    }

    #[test]
    fn score_frame_requires_entity_columns() {
        let features = Frame::from_rows(vec!["Sex".into()], vec![vec!["Male".into()]]).unwrap();
        let err = score_frame(&FixedClass(0), &features, &columns()).unwrap_err();
        assert_eq!(err.code, crate::common::MonitorCode::InvalidInput);
    }
}
