//! Unified error type for the crate.

use thiserror::Error;

/// Top-level error for hybrid-retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The corpus produced no scorable documents (empty or degenerate input).
    #[error("lexical scorer requires a non-empty corpus")]
    EmptyCorpus,

    /// The vector search collaborator failed (wrapped as text to keep the
    /// trait object-safe across backends).
    #[error("vector search backend: {0}")]
    Backend(String),
}
