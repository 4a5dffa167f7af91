//! POST /evaluate/retrieval — hybrid vs vector-only comparison for a batch
//! of queries.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::app_state::AppState;
use crate::error_handler::ErrorBody;

fn default_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct RetrievalEvalRequest {
    pub queries: Vec<String>,
    #[serde(default = "default_k")]
    pub k: usize,
}

#[derive(Debug, Serialize)]
pub struct RankedDoc {
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryComparison {
    pub query: String,
    pub hybrid_results: Vec<RankedDoc>,
    pub vector_results: Vec<RankedDoc>,
}

/// Handler: POST /evaluate/retrieval
pub async fn evaluate_retrieval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RetrievalEvalRequest>,
) -> Result<Json<Vec<QueryComparison>>, (StatusCode, Json<ErrorBody>)> {
    let mut out = Vec::with_capacity(body.queries.len());

    for query in body.queries {
        let hybrid_results = state
            .pipeline
            .hybrid_candidates(&query, body.k)
            .await
            .map_err(|e| {
                error!(target: "api", error = %e, "hybrid retrieval failed");
                ErrorBody::with_status(StatusCode::BAD_GATEWAY, e.to_string())
            })?
            .unwrap_or_default()
            .into_iter()
            .map(|h| RankedDoc { text: h.text, score: h.score })
            .collect();

        let vector_results = state
            .pipeline
            .vector_candidates(&query, body.k)
            .await
            .map_err(|e| {
                error!(target: "api", error = %e, "vector retrieval failed");
                ErrorBody::with_status(StatusCode::BAD_GATEWAY, e.to_string())
            })?
            .into_iter()
            .map(|h| RankedDoc { text: h.text, score: f64::from(h.score) })
            .collect();

        out.push(QueryComparison { query, hybrid_results, vector_results });
    }

    Ok(Json(out))
}
