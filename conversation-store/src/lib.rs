//! Conversation storage behind narrow trait interfaces.
//!
//! The pipeline consumes [`ConversationStore`] for everything session
//! related: context reads, summary compaction, exchange appends. Summaries
//! are produced by a [`Summarizer`] collaborator injected per call so the
//! store itself stays free of LLM plumbing. The bundled [`MemoryStore`] is
//! the in-process implementation; durability belongs to external backends.

mod errors;
mod memory;
mod types;

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use types::{Sender, StoredMessage};

use std::{future::Future, pin::Pin};

/// Boxed future alias shared by the storage traits.
pub type StoreFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Produces compact summaries of conversational material.
///
/// Implementations usually call a hosted model; both methods may fail and
/// callers decide whether to fall back to truncation or skip compaction.
pub trait Summarizer: Send + Sync {
    /// Summarizes one exchange (user query + assistant response) into a
    /// compact form suitable for future context.
    fn summarize_exchange<'a>(&'a self, query: &'a str, response: &'a str)
    -> StoreFuture<'a, String>;

    /// Compresses an existing summary to roughly `max_tokens` estimated
    /// tokens while keeping the essential points.
    fn compress<'a>(&'a self, summary: &'a str, max_tokens: usize) -> StoreFuture<'a, String>;
}

/// Session, message and summary bookkeeping.
///
/// All methods are safe to call for unknown sessions: reads return empty
/// context, writes create the session record implicitly. Two concurrent
/// turns for the *same* session are not coordinated here; callers serialize
/// per session.
pub trait ConversationStore: Send + Sync {
    /// Creates a new session and returns its id.
    fn create_session(&self) -> StoreFuture<'_, String>;

    /// Renders the conversation context for a session: the rolling summary
    /// (when present) followed by recent `User:`/`Assistant:` lines built
    /// from per-exchange summaries. Empty string when nothing is stored.
    fn context<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, String>;

    /// Compacts stored conversational state so the next [`context`] read
    /// fits within `max_tokens` estimated tokens. A `None` summarizer makes
    /// this a no-op; a failing summarizer falls back to hard truncation.
    ///
    /// [`context`]: ConversationStore::context
    fn ensure_summary_limit<'a>(
        &'a self,
        session_id: &'a str,
        summarizer: Option<&'a dyn Summarizer>,
        max_tokens: usize,
    ) -> StoreFuture<'a, ()>;

    /// Appends a full exchange: the user message, the assistant response
    /// (with its context summary), and the recent-exchange cache update.
    fn add_exchange<'a>(
        &'a self,
        session_id: &'a str,
        user_message: &'a str,
        response: &'a str,
        debug: Option<serde_json::Value>,
        summarizer: Option<&'a dyn Summarizer>,
    ) -> StoreFuture<'a, ()>;

    /// Appends a single raw message without touching the exchange cache.
    fn append_message<'a>(
        &'a self,
        session_id: &'a str,
        sender: Sender,
        text: &'a str,
        debug: Option<serde_json::Value>,
    ) -> StoreFuture<'a, ()>;

    /// Drops all stored state for a session.
    fn reset_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, ()>;
}
