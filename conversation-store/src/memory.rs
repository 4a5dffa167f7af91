//! In-process conversation store.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Exchange, Sender, StoredMessage};
use crate::{ConversationStore, StoreFuture, Summarizer};

/// Fallback length (chars) for assistant summaries when no summarizer is
/// available or it fails.
const SUMMARY_FALLBACK_CHARS: usize = 400;

#[derive(Default)]
struct SessionState {
    messages: Vec<StoredMessage>,
    exchanges: Vec<Exchange>,
    rolling_summary: Option<String>,
}

/// In-memory [`ConversationStore`] keyed by session id.
///
/// Keeps the full message log per session plus a bounded recent-exchange
/// cache used to render context. Suitable for single-process deployments
/// and tests; state is lost on shutdown.
pub struct MemoryStore {
    max_history: usize,
    inner: RwLock<HashMap<String, SessionState>>,
}

impl MemoryStore {
    /// `max_history` bounds how many recent exchanges feed the context.
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn render(state: &SessionState) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(summary) = &state.rolling_summary {
            parts.push(format!("Summary so far: {summary}"));
        }
        for ex in &state.exchanges {
            parts.push(format!("User: {}", ex.user));
            parts.push(format!("Assistant: {}", ex.summary));
        }
        parts.join("\n")
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Rough token estimate, 1 token ~ 4 chars, minimum 1 for non-empty text.
fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        (text.chars().count() / 4).max(1)
    }
}

fn leading_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

impl ConversationStore for MemoryStore {
    fn create_session(&self) -> StoreFuture<'_, String> {
        Box::pin(async move {
            let session_id = Uuid::new_v4().to_string();
            self.inner
                .write()
                .await
                .insert(session_id.clone(), SessionState::default());
            debug!(target: "conversation_store", %session_id, "session created");
            Ok(session_id)
        })
    }

    fn context<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let guard = self.inner.read().await;
            Ok(guard.get(session_id).map(Self::render).unwrap_or_default())
        })
    }

    fn ensure_summary_limit<'a>(
        &'a self,
        session_id: &'a str,
        summarizer: Option<&'a dyn Summarizer>,
        max_tokens: usize,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let Some(summarizer) = summarizer else {
                return Ok(());
            };

            // Snapshot the material to fold while holding the read lock only.
            let folded = {
                let guard = self.inner.read().await;
                let Some(state) = guard.get(session_id) else {
                    return Ok(());
                };
                if estimate_tokens(&Self::render(state)) <= max_tokens {
                    return Ok(());
                }
                if state.exchanges.len() <= 1 && state.rolling_summary.is_none() {
                    // Nothing older than the latest exchange to fold away.
                    return Ok(());
                }
                let older = SessionState {
                    messages: Vec::new(),
                    exchanges: state
                        .exchanges
                        .iter()
                        .take(state.exchanges.len().saturating_sub(1))
                        .cloned()
                        .collect(),
                    rolling_summary: state.rolling_summary.clone(),
                };
                Self::render(&older)
            };

            let compacted = match summarizer.compress(&folded, max_tokens).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(
                        target: "conversation_store",
                        %session_id,
                        error = %e,
                        "summary compression failed, truncating instead"
                    );
                    leading_chars(&folded, max_tokens * 4)
                }
            };

            let mut guard = self.inner.write().await;
            if let Some(state) = guard.get_mut(session_id) {
                let keep_from = state.exchanges.len().saturating_sub(1);
                state.exchanges.drain(..keep_from);
                state.rolling_summary = Some(compacted);
            }
            Ok(())
        })
    }

    fn add_exchange<'a>(
        &'a self,
        session_id: &'a str,
        user_message: &'a str,
        response: &'a str,
        debug: Option<serde_json::Value>,
        summarizer: Option<&'a dyn Summarizer>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let summary = match summarizer {
                Some(s) => match s.summarize_exchange(user_message, response).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        warn!(
                            target: "conversation_store",
                            %session_id,
                            error = %e,
                            "exchange summarization failed, truncating response"
                        );
                        leading_chars(response, SUMMARY_FALLBACK_CHARS)
                    }
                },
                None => leading_chars(response, SUMMARY_FALLBACK_CHARS),
            };

            let now = Utc::now();
            let mut guard = self.inner.write().await;
            let state = guard.entry(session_id.to_string()).or_default();

            state.messages.push(StoredMessage {
                session_id: session_id.to_string(),
                sender: Sender::User,
                text: user_message.to_string(),
                summary_for_context: None,
                created_at: now,
                debug: None,
            });
            state.messages.push(StoredMessage {
                session_id: session_id.to_string(),
                sender: Sender::Assistant,
                text: response.to_string(),
                summary_for_context: Some(summary.clone()),
                created_at: Utc::now(),
                debug,
            });

            state.exchanges.push(Exchange {
                user: user_message.to_string(),
                summary,
            });
            let overflow = state.exchanges.len().saturating_sub(self.max_history);
            if overflow > 0 {
                state.exchanges.drain(..overflow);
            }
            Ok(())
        })
    }

    fn append_message<'a>(
        &'a self,
        session_id: &'a str,
        sender: Sender,
        text: &'a str,
        debug: Option<serde_json::Value>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut guard = self.inner.write().await;
            let state = guard.entry(session_id.to_string()).or_default();
            state.messages.push(StoredMessage {
                session_id: session_id.to_string(),
                sender,
                text: text.to_string(),
                summary_for_context: None,
                created_at: Utc::now(),
                debug,
            });
            Ok(())
        })
    }

    fn reset_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.inner.write().await.remove(session_id);
            debug!(target: "conversation_store", %session_id, "session reset");
            Ok(())
        })
    }
}
