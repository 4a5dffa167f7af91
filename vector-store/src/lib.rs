//! Qdrant-backed passage index.
//!
//! This crate owns the corpus at rest: passages are ingested with their
//! stable corpus index stored in the point payload, so every search hit can
//! report which passage it is without any text-equality lookup. The
//! [`VectorStore`] implements `hybrid_retrieval::VectorSearch` and is the
//! production collaborator behind the fusion retriever.

mod config;
mod embed;
mod errors;
mod io_jsonl;
mod qdrant_facade;

pub use config::{DistanceKind, VectorStoreConfig};
pub use embed::{EmbeddingsProvider, noop::NoopEmbedder, ollama::{OllamaConfig, OllamaEmbedder}};
pub use errors::VectorStoreError;
pub use io_jsonl::read_corpus;

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use qdrant_client::qdrant::{PointId, PointStruct, Vector, Vectors, vectors};
use tracing::{info, warn};

use hybrid_retrieval::{Corpus, RetrievalError, VectorHit, VectorSearch};

use crate::qdrant_facade::{QdrantFacade, qinteger, qstring};

/// High-level facade wiring configuration, embeddings and the Qdrant client.
pub struct VectorStore {
    cfg: VectorStoreConfig,
    facade: QdrantFacade,
    embedder: Arc<dyn EmbeddingsProvider>,
    corpus: Arc<Corpus>,
}

impl VectorStore {
    /// Constructs a new store for one corpus snapshot.
    ///
    /// # Errors
    /// Returns [`VectorStoreError::Config`] / [`VectorStoreError::Qdrant`]
    /// if validation or client initialization fails.
    pub fn new(
        cfg: VectorStoreConfig,
        embedder: Arc<dyn EmbeddingsProvider>,
        corpus: Arc<Corpus>,
    ) -> Result<Self, VectorStoreError> {
        let facade = QdrantFacade::new(&cfg)?;
        Ok(Self { cfg, facade, embedder, corpus })
    }

    /// Corpus snapshot this store serves.
    pub fn corpus(&self) -> Arc<Corpus> {
        self.corpus.clone()
    }

    /// Makes sure the collection holds the full corpus, embedding and
    /// upserting whatever is missing. `force` drops and re-ingests.
    ///
    /// Returns the number of points ingested (0 when already up to date).
    ///
    /// # Errors
    /// Propagates embedding and Qdrant failures.
    pub async fn ensure_indexed(&self, force: bool) -> Result<usize, VectorStoreError> {
        if force {
            self.facade.drop_collection().await.ok();
        }
        self.facade.ensure_collection(self.cfg.embedding_dim).await?;

        let have = self.facade.point_count().await?;
        let want = self.corpus.len() as u64;
        if !force && have >= want {
            info!(
                target: "vector_store",
                points = have,
                "collection already holds the corpus"
            );
            return Ok(0);
        }

        info!(
            target: "vector_store",
            passages = self.corpus.len(),
            "embedding corpus for ingestion"
        );

        let embedder = &self.embedder;
        let embedded: Vec<(usize, Vec<f32>)> = stream::iter(self.corpus.iter().map(
            |(index, text)| {
                let text = text.to_string();
                let embedder = embedder.clone();
                async move { embedder.embed(&text).await.map(|v| (index, v)) }
            },
        ))
        .buffered(self.cfg.embedding_concurrency.max(1))
        .try_collect()
        .await?;

        let mut ingested = 0usize;
        for chunk in embedded.chunks(self.cfg.upsert_batch) {
            let points: Vec<PointStruct> = chunk
                .iter()
                .map(|(index, vector)| self.to_point(*index, vector.clone()))
                .collect();
            ingested += points.len();
            self.facade.upsert_points(points).await?;
        }

        info!(target: "vector_store", ingested, "corpus ingested");
        Ok(ingested)
    }

    fn to_point(&self, index: usize, vector: Vec<f32>) -> PointStruct {
        let mut payload: HashMap<String, qdrant_client::qdrant::Value> = HashMap::new();
        payload.insert("index".into(), qinteger(index as i64));
        if let Some(text) = self.corpus.get(index) {
            payload.insert("text".into(), qstring(text));
        }

        let vectors = Vectors {
            vectors_options: Some(vectors::VectorsOptions::Vector(Vector {
                data: vector,
                indices: None,
                vectors_count: None,
                vector: None,
            })),
        };

        PointStruct {
            id: Some(PointId::from(index as u64)),
            payload,
            vectors: Some(vectors),
            ..Default::default()
        }
    }
}

impl VectorSearch for VectorStore {
    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<VectorHit>, RetrievalError>> + Send + 'a>,
    > {
        Box::pin(async move {
            if k == 0 || self.corpus.is_empty() {
                return Ok(Vec::new());
            }

            let vector = self
                .embedder
                .embed(query)
                .await
                .map_err(|e| RetrievalError::Backend(e.to_string()))?;

            let hits = self
                .facade
                .search(vector, k as u64, self.cfg.exact_search)
                .await
                .map_err(|e| RetrievalError::Backend(e.to_string()))?;

            let mut out = Vec::with_capacity(hits.len());
            for (score, payload) in hits {
                let Some(index) = payload.get("index").and_then(|v| v.as_u64()) else {
                    warn!(target: "vector_store", "hit without index payload, skipping");
                    continue;
                };
                let text = payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or_else(|| self.corpus.get(index as usize).map(str::to_string))
                    .unwrap_or_default();
                out.push(VectorHit {
                    index: index as usize,
                    text,
                    score,
                });
            }
            Ok(out)
        })
    }
}
