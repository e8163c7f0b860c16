//! Route table

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use registry_config::ServerSettings;

use crate::handlers::{self, AppState};

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "ok": false,
            "message": "not found; available routes are POST /train, POST /predict, GET /health and GET /models",
        })),
    )
}

/// Builds the application router
pub fn create_router(state: AppState, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/train", post(handlers::train))
        .route("/predict", post(handlers::predict))
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::list_models))
        .fallback(handle_404)
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(settings.request_timeout_secs))),
        )
        .with_state(state)
}
