//! Runtime and collection configuration.

use crate::errors::VectorStoreError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

/// Configuration for passage ingestion and retrieval.
#[derive(Clone, Debug)]
pub struct VectorStoreConfig {
    /// Qdrant HTTP endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Target collection name.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Embedding dimensionality; every vector is checked against it.
    pub embedding_dim: usize,
    /// Upsert batch size (typical range: 128..512).
    pub upsert_batch: usize,
    /// Parallel in-flight embedding requests during ingestion.
    pub embedding_concurrency: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Embedding server base URL (Ollama-compatible `/api/embeddings`).
    pub embed_url: String,
    /// Embedding model name.
    pub embed_model: String,
}

impl VectorStoreConfig {
    /// Builds from environment variables with defaults suitable for a local
    /// Qdrant + Ollama pair.
    pub fn from_env() -> Self {
        Self {
            qdrant_url: env("QDRANT_URL", "http://localhost:6334"),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok(),
            collection: env("QDRANT_COLLECTION", "legal_passages"),
            distance: DistanceKind::Cosine,
            embedding_dim: parse("EMBEDDING_DIM", 768usize),
            upsert_batch: parse("QDRANT_BATCH_SIZE", 256usize),
            embedding_concurrency: parse("EMBEDDING_CONCURRENCY", 4usize),
            exact_search: env("EXACT_SEARCH", "false") == "true",
            embed_url: env("OLLAMA_URL", "http://localhost:11434"),
            embed_model: env("EMBED_MODEL", "nomic-embed-text"),
        }
    }

    /// Validates config values.
    ///
    /// # Errors
    /// [`VectorStoreError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<(), VectorStoreError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(VectorStoreError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(VectorStoreError::Config("collection is empty".into()));
        }
        if self.embedding_dim == 0 {
            return Err(VectorStoreError::Config("embedding_dim must be > 0".into()));
        }
        if self.upsert_batch == 0 {
            return Err(VectorStoreError::Config("upsert_batch must be > 0".into()));
        }
        Ok(())
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
