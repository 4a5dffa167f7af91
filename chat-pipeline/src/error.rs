//! Typed error for the chat-pipeline crate.
//!
//! Only unexpected orchestration faults propagate out of a turn; the
//! anticipated failure modes (retrieval unavailable, persistence, summary
//! compaction, evaluation) degrade in place and never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// `chat` was called before `initialize` completed.
    #[error("pipeline is not initialized")]
    NotInitialized,

    /// Text generation collaborator failed.
    #[error("generation error: {0}")]
    Generation(String),

    /// Errors from the retrieval layer.
    #[error("retrieval error: {0}")]
    Retrieval(#[from] hybrid_retrieval::RetrievalError),

    /// Errors from the conversation store.
    #[error("store error: {0}")]
    Store(#[from] conversation_store::StoreError),

    /// Evaluation collaborator failed in an unexpected way.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl From<llm_service::LlmServiceError> for PipelineError {
    fn from(e: llm_service::LlmServiceError) -> Self {
        PipelineError::Generation(e.to_string())
    }
}
