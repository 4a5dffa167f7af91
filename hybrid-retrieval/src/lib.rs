//! Hybrid retrieval: BM25 lexical scoring fused with vector search.
//!
//! The [`HybridRetriever`] merges a full-corpus lexical ranking with the
//! backend's vector ranking via reciprocal-rank fusion. Queries with no
//! scorable tokens bypass fusion and return the vector results unchanged.

mod corpus;
mod errors;
mod fusion;
mod lexical;
mod vector;

pub use corpus::Corpus;
pub use errors::RetrievalError;
pub use fusion::{RRF_CONSTANT, RankedSource, reciprocal_rank_fuse};
pub use lexical::{Bm25Scorer, tokenize};
pub use vector::{VectorHit, VectorSearch};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

/// A passage after fusion: corpus index, text and fused relevance score.
#[derive(Debug, Clone, Serialize)]
pub struct FusedHit {
    pub index: usize,
    pub text: String,
    pub score: f64,
}

impl From<VectorHit> for FusedHit {
    fn from(h: VectorHit) -> Self {
        Self {
            index: h.index,
            text: h.text,
            score: f64::from(h.score),
        }
    }
}

/// Lexical + vector retriever over one immutable corpus snapshot.
///
/// Construction tokenizes the whole corpus once. If the corpus is degenerate
/// the constructor fails and the session must fall back to vector-only
/// search for its whole lifetime; there is no retry path.
pub struct HybridRetriever {
    corpus: Arc<Corpus>,
    scorer: Bm25Scorer,
    vector: Arc<dyn VectorSearch>,
}

impl HybridRetriever {
    /// Builds the retriever, constructing the BM25 scorer over `corpus`.
    ///
    /// # Errors
    /// Returns [`RetrievalError::EmptyCorpus`] for a corpus with no passages.
    pub fn new(corpus: Arc<Corpus>, vector: Arc<dyn VectorSearch>) -> Result<Self, RetrievalError> {
        let scorer = Bm25Scorer::new(&corpus)?;
        debug!(
            target: "hybrid_retrieval",
            passages = corpus.len(),
            "hybrid retriever initialized"
        );
        Ok(Self { corpus, scorer, vector })
    }

    /// Fuses lexical and vector rankings for `query`, returning at most `k`
    /// hits in descending fused-score order.
    ///
    /// `alpha` weights the vector contribution (lexical weight is fixed at
    /// 1.0): 0.5 blends evenly, 0.9 lets the vector ranking dominate, 0.0
    /// reduces the result to the lexical order.
    ///
    /// # Errors
    /// Propagates vector backend failures. Lexical scoring itself cannot
    /// fail after construction.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        alpha: f64,
    ) -> Result<Vec<FusedHit>, RetrievalError> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            debug!(target: "hybrid_retrieval", "no scorable query tokens, vector-only");
            let hits = self.vector.search(query, k).await?;
            return Ok(hits.into_iter().map(FusedHit::from).collect());
        }

        let scores = self.scorer.scores(&query_tokens);
        let mut lexical_ranked: Vec<usize> = (0..self.corpus.len()).collect();
        lexical_ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        // Full ranking from the vector side so both sources cover the same
        // candidate space before truncation.
        let vector_hits = self.vector.search(query, self.corpus.len()).await?;
        let vector_ranked: Vec<usize> = vector_hits
            .iter()
            .map(|h| h.index)
            .filter(|&i| i < self.corpus.len())
            .collect();

        let window = (k * 3).min(self.corpus.len());
        let fused = reciprocal_rank_fuse(
            &[
                RankedSource {
                    weight: 1.0,
                    indices: &lexical_ranked[..window.min(lexical_ranked.len())],
                },
                RankedSource {
                    weight: alpha,
                    indices: &vector_ranked[..window.min(vector_ranked.len())],
                },
            ],
            self.corpus.len(),
        );

        Ok(fused
            .into_iter()
            .take(k)
            .filter_map(|(index, score)| {
                self.corpus.get(index).map(|text| FusedHit {
                    index,
                    text: text.to_string(),
                    score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{future::Future, pin::Pin};

    /// Fixed-ranking backend for fusion tests.
    struct FixedVectorSearch {
        hits: Vec<VectorHit>,
    }

    impl FixedVectorSearch {
        fn ranking(indices: &[usize], corpus: &Corpus) -> Self {
            let hits = indices
                .iter()
                .enumerate()
                .map(|(rank, &index)| VectorHit {
                    index,
                    text: corpus.get(index).unwrap_or_default().to_string(),
                    score: 1.0 - rank as f32 * 0.1,
                })
                .collect();
            Self { hits }
        }
    }

    impl VectorSearch for FixedVectorSearch {
        fn search<'a>(
            &'a self,
            _query: &'a str,
            k: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<VectorHit>, RetrievalError>> + Send + 'a>>
        {
            let out: Vec<VectorHit> = self.hits.iter().take(k).cloned().collect();
            Box::pin(async move { Ok(out) })
        }
    }

    fn legal_corpus() -> Arc<Corpus> {
        Corpus::new(vec![
            "Article 21 protects right to life.".to_string(),
            "Article 14 ensures equality.".to_string(),
        ])
        .into_shared()
    }

    #[tokio::test]
    async fn tokenless_query_falls_back_to_vector_order() {
        let corpus = legal_corpus();
        let vector = Arc::new(FixedVectorSearch::ranking(&[1, 0], &corpus));
        let retriever = HybridRetriever::new(corpus, vector.clone()).unwrap();

        // "? !" tokenizes to nothing ("?" and "!" are single-char tokens).
        let fused = retriever.search("? !", 2, 0.5).await.unwrap();
        let direct = vector.search("? !", 2).await.unwrap();

        assert_eq!(fused.len(), direct.len());
        for (f, d) in fused.iter().zip(direct.iter()) {
            assert_eq!(f.index, d.index);
            assert_eq!(f.text, d.text);
        }
        assert_eq!(fused[0].index, 1);
    }

    #[tokio::test]
    async fn alpha_zero_yields_lexical_order() {
        let corpus = legal_corpus();
        // Vector ranking prefers the equality passage; with alpha = 0 it
        // must not matter.
        let vector = Arc::new(FixedVectorSearch::ranking(&[1, 0], &corpus));
        let retriever = HybridRetriever::new(corpus, vector).unwrap();

        let fused = retriever.search("life", 1, 0.0).await.unwrap();
        assert_eq!(fused[0].index, 0);
        assert!(fused[0].text.contains("right to life"));
    }

    #[tokio::test]
    async fn agreement_on_rank_zero_wins_fusion() {
        let corpus = legal_corpus();
        let vector = Arc::new(FixedVectorSearch::ranking(&[0, 1], &corpus));
        let retriever = HybridRetriever::new(corpus, vector).unwrap();

        let fused = retriever.search("life", 2, 0.9).await.unwrap();
        assert_eq!(fused[0].index, 0);
        assert!(fused.len() <= 2);
        assert!(fused[0].score > fused[1].score);
    }

    #[tokio::test]
    async fn result_len_capped_at_k() {
        let corpus = Corpus::new(
            (0..10)
                .map(|i| format!("passage number {i} about constitutional provisions"))
                .collect(),
        )
        .into_shared();
        let ranking: Vec<usize> = (0..10).collect();
        let vector = Arc::new(FixedVectorSearch::ranking(&ranking, &corpus));
        let retriever = HybridRetriever::new(corpus, vector).unwrap();

        let fused = retriever.search("constitutional provisions", 3, 0.5).await.unwrap();
        assert_eq!(fused.len(), 3);
    }

    #[test]
    fn empty_corpus_fails_construction() {
        let corpus = Corpus::new(vec![]).into_shared();
        let vector = Arc::new(FixedVectorSearch { hits: vec![] });
        assert!(HybridRetriever::new(corpus, vector).is_err());
    }
}
