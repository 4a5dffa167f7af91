//! Request/response DTOs for POST /chat.

use serde::{Deserialize, Serialize};

use chat_pipeline::{EvaluationReport, TurnDebug};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub query: String,
    #[serde(default = "default_true")]
    pub include_history: bool,
    #[serde(default)]
    pub evaluate: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub debug: TurnDebug,
    pub evaluation: Option<EvaluationReport>,
}
