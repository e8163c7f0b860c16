//! Request handlers

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use common::error::Result;
use common::models::{HealthStatus, PredictRequest, PredictResponse, TrainRequest, TrainResponse};
use model_manager::ArtifactSummary;
use registry_core::RegistryEngine;

use crate::error::ApiError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Registry engine
    pub engine: Arc<RegistryEngine>,
}

impl AppState {
    /// Creates a new handler state
    pub fn new(engine: Arc<RegistryEngine>) -> Self {
        Self { engine }
    }
}

/// Query string of `GET /models`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Restrict to one model key
    pub model_key: Option<String>,

    /// Restrict to one schema fingerprint
    pub schema_hash: Option<String>,
}

// Training and scoring are CPU-bound and touch the filesystem.
async fn run_blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

/// `POST /train`
pub async fn train(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TrainRequest>, JsonRejection>,
) -> std::result::Result<Json<TrainResponse>, ApiError> {
    let Json(request) = payload?;
    debug!(
        model_key = %request.model_key,
        rows = request.x.len(),
        features = request.feature_names.len(),
        "Train request"
    );

    let engine = state.engine.clone();
    let response = run_blocking(move || engine.train(request)).await?;
    Ok(Json(response))
}

/// `POST /predict`
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> std::result::Result<Json<PredictResponse>, ApiError> {
    let Json(request) = payload?;
    debug!(model_key = %request.model_key, "Predict request");

    let engine = state.engine.clone();
    let response = run_blocking(move || engine.predict(&request)).await?;
    Ok(Json(response))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.engine.health())
}

/// `GET /models`
pub async fn list_models(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> std::result::Result<Json<Vec<ArtifactSummary>>, ApiError> {
    let Query(query) = query?;

    let engine = state.engine.clone();
    let listed = run_blocking(move || {
        engine.list(query.model_key.as_deref(), query.schema_hash.as_deref())
    })
    .await?;
    Ok(Json(listed))
}
