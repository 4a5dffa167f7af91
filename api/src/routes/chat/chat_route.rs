//! POST /chat — runs one conversational turn.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tracing::error;

use chat_pipeline::PipelineError;

use crate::core::app_state::AppState;
use crate::error_handler::ErrorBody;
use crate::routes::chat::chat_request::{ChatRequest, ChatResponse};

/// Handler: POST /chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chat \
///   -H 'content-type: application/json' \
///   -d '{"session_id":"...","query":"What is Article 21?","evaluate":false}'
/// ```
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorBody>)> {
    if !state.pipeline.is_initialized().await {
        return Err(ErrorBody::with_status(
            StatusCode::BAD_REQUEST,
            "pipeline not initialized",
        ));
    }

    let out = state
        .pipeline
        .chat(&body.session_id, &body.query, body.include_history, body.evaluate)
        .await
        .map_err(|e| {
            error!(target: "api", error = %e, "chat turn failed");
            match e {
                PipelineError::NotInitialized => {
                    ErrorBody::with_status(StatusCode::BAD_REQUEST, "pipeline not initialized")
                }
                other => ErrorBody::with_status(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("chat processing failed: {other}"),
                ),
            }
        })?;

    Ok(Json(ChatResponse {
        response: out.response,
        debug: out.debug,
        evaluation: out.evaluation,
    }))
}
