//! Message and exchange records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Who authored a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One persisted chat message.
///
/// Assistant messages additionally carry `summary_for_context`: a compact
/// rendition used when building future conversation context, so full answers
/// never inflate later prompts.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub sender: Sender,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_for_context: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

/// Recent-exchange cache entry: the user's message plus the compact summary
/// of the assistant's reply.
#[derive(Debug, Clone)]
pub(crate) struct Exchange {
    pub user: String,
    pub summary: String,
}
