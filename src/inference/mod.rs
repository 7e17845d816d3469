//! Inference domain: schema normalization, prediction decoding and the
//! serving orchestrator.

pub mod domain;
pub mod encode;
pub mod service;

pub use domain::{decode_prediction, Classifier, ColumnList, IncomeBand, LinearModel, Matrix};
pub use encode::normalize;
pub use service::{score_frame, PredictRequest, PredictResponse, Predictor};
