//! Vector search collaborator contract.

use std::{future::Future, pin::Pin};

use serde::Serialize;

use crate::errors::RetrievalError;

/// One hit returned by a vector search backend.
///
/// The corpus index travels with the hit: backends persist it next to the
/// passage at ingest time so fusion never has to re-derive positions from
/// text equality (which is ambiguous for duplicated passages).
#[derive(Debug, Clone, Serialize)]
pub struct VectorHit {
    /// Stable corpus index of the passage.
    pub index: usize,
    /// Passage text.
    pub text: String,
    /// Similarity score, roughly in [-1, 1], descending across a result set.
    pub score: f32,
}

/// Similarity search over the embedded corpus.
///
/// Implementations may block on network I/O. Results are ordered by
/// descending similarity and hold at most `k` entries.
pub trait VectorSearch: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VectorHit>, RetrievalError>> + Send + 'a>>;
}
