//! Session lifecycle: POST /sessions, POST /sessions/{id}/reset.

use std::sync::Arc;

use axum::{Json, extract::{Path, State}, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::app_state::AppState;
use crate::error_handler::ErrorBody;

#[derive(Debug, Deserialize)]
pub struct SessionCreateRequest {
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "New Chat".to_string()
}

#[derive(Debug, Serialize)]
pub struct SessionCreateResponse {
    pub session_id: String,
    pub title: String,
}

/// Handler: POST /sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SessionCreateRequest>,
) -> Result<Json<SessionCreateResponse>, (StatusCode, Json<ErrorBody>)> {
    let session_id = state.pipeline.create_session().await.map_err(|e| {
        error!(target: "api", error = %e, "session creation failed");
        ErrorBody::with_status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(SessionCreateResponse { session_id, title: body.title }))
}

#[derive(Debug, Serialize)]
pub struct SessionResetResponse {
    pub status: &'static str,
    pub session_id: String,
}

/// Handler: POST /sessions/{session_id}/reset
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResetResponse>, (StatusCode, Json<ErrorBody>)> {
    state.pipeline.reset_session(&session_id).await.map_err(|e| {
        error!(target: "api", error = %e, "session reset failed");
        ErrorBody::with_status(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(SessionResetResponse { status: "reset", session_id }))
}
