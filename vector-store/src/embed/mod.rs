//! Embedding provider interface.

use std::{future::Future, pin::Pin};

use crate::errors::VectorStoreError;

/// Provider interface for embedding generation.
///
/// Async because real providers (Ollama, OpenAI, ...) perform HTTP requests.
/// Implement this trait to plug in a different embedding backend.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, VectorStoreError>> + Send + 'a>>;
}

pub mod noop;
pub mod ollama;
