//! Ollama embedding provider.
//!
//! Calls `POST {base}/api/embeddings` with `{model, prompt}` and validates
//! the returned vector dimension.

use std::{future::Future, pin::Pin};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::embed::EmbeddingsProvider;
use crate::errors::VectorStoreError;

/// Configuration for the Ollama embedding backend.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Server base URL, e.g. `http://localhost:11434`.
    pub url: String,
    /// Model name, e.g. `nomic-embed-text`.
    pub model: String,
    /// Expected embedding dimension.
    pub dim: usize,
}

/// Ollama embedding provider (async).
#[derive(Clone)]
pub struct OllamaEmbedder {
    http: Client,
    base: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    /// Constructs a new embedder from configuration.
    pub fn new(cfg: OllamaConfig) -> Self {
        Self {
            http: Client::new(),
            base: cfg.url.trim_end_matches('/').to_string(),
            model: cfg.model,
            dim: cfg.dim,
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl EmbeddingsProvider for OllamaEmbedder {
    fn embed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, VectorStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/api/embeddings", self.base);
            let resp = self
                .http
                .post(&url)
                .json(&EmbedRequest { model: &self.model, prompt: text })
                .send()
                .await
                .map_err(|e| VectorStoreError::Embedding(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(VectorStoreError::Embedding(format!(
                    "HTTP {} from {url}",
                    resp.status()
                )));
            }

            let data: EmbedResponse = resp
                .json()
                .await
                .map_err(|e| VectorStoreError::Embedding(e.to_string()))?;

            if data.embedding.len() != self.dim {
                return Err(VectorStoreError::VectorSizeMismatch {
                    got: data.embedding.len(),
                    want: self.dim,
                });
            }

            debug!(target: "vector_store::embed", len = data.embedding.len(), "embedded text");
            Ok(data.embedding)
        })
    }
}
