//! API error responses.
//!
//! Everything below the top-level handlers is converted into a valid
//! report before it can escape the pipeline; what remains here is the one
//! failure shape callers must handle without a report body: a structured
//! `{error, message}` JSON object with HTTP 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::storage::StoreError;

/// Wire shape of a non-report failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self);
        let body = ErrorBody {
            error: "Internal server error".to_string(),
            message: self.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
