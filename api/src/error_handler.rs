//! JSON error envelope for handlers.

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// Body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    /// Pairs the body with a status code, ready to return from a handler.
    pub fn with_status(
        status: StatusCode,
        detail: impl Into<String>,
    ) -> (StatusCode, Json<ErrorBody>) {
        (status, Json(ErrorBody { detail: detail.into() }))
    }
}
