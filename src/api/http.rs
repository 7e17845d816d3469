//! HTTP surface of the serving path.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::common::error::{MonitorError, MonitorResult};
use crate::inference::service::{PredictRequest, PredictResponse, Predictor};

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<Predictor>,
}

/// Failed request; every core error maps to a server error.
#[derive(Debug)]
pub struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::error!(code = self.0.code.as_str(), error = %self.0.msg, "request failed");
        let body = Json(json!({
            "code": self.0.code.as_str(),
            "error": self.0.msg,
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub fn router(predictor: Arc<Predictor>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .with_state(AppState { predictor })
}

async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    // Feature lookup and the drift lock are blocking.
    let response = tokio::task::spawn_blocking(move || state.predictor.predict(&request))
        .await
        .map_err(|e| MonitorError::internal(format!("predict task failed: {e}")))??;
    Ok(Json(response))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(predictor: Arc<Predictor>, addr: &str) -> MonitorResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| MonitorError::config(format!("invalid BIND_ADDR '{addr}': {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "serving predictions");
    axum::serve(listener, router(predictor)).await?;
    Ok(())
}
