//! Thin adapter around `qdrant-client` to isolate API usage.
//!
//! Concentrates all Qdrant interactions behind a minimal API, hiding the
//! verbose builder pattern from the rest of the crate.

use crate::config::{DistanceKind, VectorStoreConfig};
use crate::errors::VectorStoreError;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchParamsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value,
};
use tracing::{debug, info, warn};

/// A facade over the Qdrant client.
pub struct QdrantFacade {
    client: Qdrant,
    collection: String,
    distance: DistanceKind,
}

impl QdrantFacade {
    /// Creates a new facade from the given configuration.
    pub fn new(cfg: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| VectorStoreError::Qdrant(e.to_string()))?;

        Ok(Self {
            client,
            collection: cfg.collection.clone(),
            distance: cfg.distance,
        })
    }

    /// Ensures that the collection exists, creating it when missing.
    pub async fn ensure_collection(&self, dim: usize) -> Result<(), VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => {
                debug!("collection '{}' already exists", self.collection);
                return Ok(());
            }
            Err(err) => {
                warn!(
                    "collection '{}' not found, will be created (error={})",
                    self.collection, err
                );
            }
        }

        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, distance)),
            )
            .await
            .map_err(|e| VectorStoreError::Qdrant(e.to_string()))?;

        info!("collection '{}' created", self.collection);
        Ok(())
    }

    /// Drops the collection if it exists. Used for forced re-ingestion.
    pub async fn drop_collection(&self) -> Result<(), VectorStoreError> {
        self.client
            .delete_collection(&self.collection)
            .await
            .map_err(|e| VectorStoreError::Qdrant(e.to_string()))?;
        info!("collection '{}' dropped", self.collection);
        Ok(())
    }

    /// Number of points currently stored, or 0 when the collection is absent.
    pub async fn point_count(&self) -> Result<u64, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(info
                .result
                .and_then(|r| r.points_count)
                .unwrap_or(0)),
            Err(_) => Ok(0),
        }
    }

    /// Upserts a batch of points.
    pub async fn upsert_points(&self, points: Vec<PointStruct>) -> Result<(), VectorStoreError> {
        if points.is_empty() {
            debug!("no points provided for upsert");
            return Ok(());
        }

        debug!(
            "upserting {} points into collection '{}'",
            points.len(),
            self.collection
        );

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .map_err(|e| VectorStoreError::Qdrant(e.to_string()))?;

        Ok(())
    }

    /// Similarity search, returning `(score, payload)` tuples sorted by score.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        exact: bool,
    ) -> Result<Vec<(f32, serde_json::Value)>, VectorStoreError> {
        debug!(
            "searching '{}' with top_k={} exact={}",
            self.collection, top_k, exact
        );

        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector, top_k).with_payload(true);
        if exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorStoreError::Qdrant(e.to_string()))?;

        let mut out = Vec::with_capacity(res.result.len());
        for r in res.result.into_iter() {
            out.push((r.score, qpayload_to_json(r.payload)));
        }
        Ok(out)
    }
}

/// Converts a Qdrant payload map into JSON. Unsupported nested types map to
/// `Null`.
fn qpayload_to_json(mut p: std::collections::HashMap<String, QValue>) -> serde_json::Value {
    use qdrant_client::qdrant::value::Kind as K;
    let mut m = serde_json::Map::new();
    for (k, v) in p.drain() {
        let j = match v.kind {
            Some(K::StringValue(s)) => serde_json::Value::String(s),
            Some(K::IntegerValue(i)) => serde_json::Value::Number(i.into()),
            Some(K::DoubleValue(f)) => serde_json::json!(f),
            Some(K::BoolValue(b)) => serde_json::Value::Bool(b),
            _ => serde_json::Value::Null,
        };
        m.insert(k, j);
    }
    serde_json::Value::Object(m)
}

/// Wraps a string into a Qdrant `Value`.
pub(crate) fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(value::Kind::StringValue(s.to_string())),
    }
}

/// Wraps an integer into a Qdrant `Value`.
pub(crate) fn qinteger(i: i64) -> QValue {
    QValue {
        kind: Some(value::Kind::IntegerValue(i)),
    }
}
