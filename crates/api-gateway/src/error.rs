//! HTTP error mapping
//!
//! Expected outcomes such as "model not found" never reach this type; they
//! travel as `ok: false` bodies with status 200. Only malformed requests and
//! infrastructure faults are turned into error statuses here.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use common::error::Error;
use common::utils::truncate_string;

// Keeps error bodies readable when the cause embeds a long path or payload.
const MAX_MESSAGE_LEN: usize = 512;

/// Errors surfaced by the REST layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body or query could not be decoded
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Failure inside the registry
    #[error(transparent)]
    Registry(#[from] Error),

    /// The blocking worker panicked or was cancelled
    #[error("worker failed: {0}")]
    Worker(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Status code this error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Registry(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Registry(e) if e.is_invalid_argument() => StatusCode::BAD_REQUEST,
            ApiError::Registry(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = truncate_string(&self.to_string(), MAX_MESSAGE_LEN);

        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            warn!(status = status.as_u16(), "Request rejected: {}", message);
        }

        let body = Json(json!({
            "ok": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}
