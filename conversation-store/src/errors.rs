//! Unified error type for conversation storage.

use thiserror::Error;

/// Top-level error for conversation-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The summarizer collaborator failed to produce output.
    #[error("summarizer failure: {0}")]
    Summarizer(String),

    /// A backing store failed (network, disk, ...). The in-memory
    /// implementation never raises this; persistent backends do.
    #[error("store backend: {0}")]
    Backend(String),
}
