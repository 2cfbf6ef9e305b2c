//! HTTP request handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::inference::{BatchPrediction, ChurnPredictor, CustomerRecord, PredictionResponse};

pub const API_VERSION: &str = "1.0.0";

async fn require_predictor(state: &AppState) -> Result<Arc<ChurnPredictor>> {
    state
        .predictor()
        .await
        .ok_or_else(|| ServerError::ModelUnavailable("no predictor loaded".to_string()))
}

/// Predictor calls are CPU-bound; keep them off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Customer Churn Prediction API",
        "status": "running",
        "model_loaded": state.is_loaded().await,
    }))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let loaded = state.is_loaded().await;
    Json(json!({
        "status": if loaded { "healthy" } else { "degraded" },
        "model_loaded": loaded,
        "preprocessor_loaded": loaded,
    }))
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(record): Json<CustomerRecord>,
) -> Result<Json<PredictionResponse>> {
    let predictor = require_predictor(&state).await?;
    let response = run_blocking(move || predictor.predict(&record)).await?;
    info!(
        probability = response.churn_probability,
        prediction = %response.churn_prediction,
        "Prediction served"
    );
    Ok(Json(response))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub predictions: Vec<BatchPrediction>,
}

pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<CustomerRecord>>,
) -> Result<Json<BatchPredictionResponse>> {
    let predictor = require_predictor(&state).await?;
    let n = records.len();
    let predictions = run_blocking(move || predictor.predict_batch(&records)).await?;
    info!(records = n, "Batch prediction served");
    Ok(Json(BatchPredictionResponse { predictions }))
}

pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let predictor = state.predictor().await;
    Json(json!({
        "model_loaded": predictor.is_some(),
        "model_type": predictor.as_ref().map(|p| p.model_name()),
        "preprocessor_loaded": predictor.is_some(),
        "feature_columns": predictor.as_ref().map(|p| p.feature_columns().to_vec()),
        "api_version": API_VERSION,
    }))
}

pub async fn reload_model(State(state): State<Arc<AppState>>) -> Json<Value> {
    info!("Manual model reload requested");
    match state.reload().await {
        Ok(_) => Json(json!({
            "status": "success",
            "model_loaded": true,
            "message": "Model reloaded successfully",
        })),
        Err(e) => {
            warn!(error = %e, "Model reload failed, keeping the previous predictor");
            Json(json!({
                "status": "failed",
                "model_loaded": state.is_loaded().await,
                "message": format!("Model reload failed: {}", e),
            }))
        }
    }
}
