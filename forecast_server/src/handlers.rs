//! HTTP request handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use forecast_core::ForecastPipeline;
use serde_json::Value;
use tracing::info;

use crate::error::{Result, ServerError};
use crate::payload::{PredictRequest, PredictResponse};
use crate::state::AppState;

/// Forecast the series in the request body
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(body) = body.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => ServerError::UnsupportedMediaType,
        other => ServerError::BadRequest(other.body_text()),
    })?;

    let request = PredictRequest::from_value(body)?;
    let rows = request.records.len();
    let pipeline =
        ForecastPipeline::new(request.params)?.with_model_config(state.model_config.clone());

    let started = Instant::now();
    let records = request.records;
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&records))
        .await
        .map_err(|e| ServerError::Internal(format!("Forecast task failed: {}", e)))??;

    info!(
        rows,
        window_size = outcome.window_size,
        horizon = outcome.forecast.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Served forecast"
    );

    Ok(Json(PredictResponse::from(&outcome)))
}

/// Liveness check
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
