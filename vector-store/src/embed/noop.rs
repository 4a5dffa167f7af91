use std::{future::Future, pin::Pin};

use crate::embed::EmbeddingsProvider;
use crate::errors::VectorStoreError;

/// Provider that refuses to embed. Useful when a deployment only ever reads
/// from an already-ingested collection.
#[derive(Clone)]
pub struct NoopEmbedder;

impl EmbeddingsProvider for NoopEmbedder {
    fn embed<'a>(
        &'a self,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, VectorStoreError>> + Send + 'a>> {
        Box::pin(async { Err(VectorStoreError::Embedding("no embedding provider".into())) })
    }
}
