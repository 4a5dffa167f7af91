//! Context budget scheduling.
//!
//! The scheduler sizes retrieved and conversational context to a token
//! ceiling. It only ever shrinks: fewer passages, a compacted conversation
//! summary, and as a last resort hard character truncation. The loop is
//! bounded by `(desired_k - min_k + 1)` retrievals plus at most one
//! summarization attempt plus the terminal truncation branch.

use std::{future::Future, pin::Pin};

use tracing::{debug, warn};

use conversation_store::{ConversationStore, Summarizer};

use crate::error::PipelineError;
use crate::estimate::{TokenEstimator, leading_chars, trailing_chars};

/// One scored passage from the retrieval layer.
#[derive(Debug, Clone)]
pub struct ScoredPassage {
    pub index: usize,
    pub text: String,
    pub score: f64,
}

/// Retrieval capability the scheduler iterates over. Implemented by the
/// pipeline over either the hybrid retriever or the vector-only fallback.
pub trait ContextRetriever: Send + Sync {
    fn retrieve<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, PipelineError>> + Send + 'a>>;
}

/// Inputs for one `assemble` call.
pub struct BudgetRequest<'a> {
    pub session_id: &'a str,
    pub query: &'a str,
    pub conversation_context: String,
    pub desired_k: usize,
    pub min_k: usize,
    pub available_tokens: usize,
    pub include_history: bool,
}

/// Result of budget scheduling.
#[derive(Debug, Clone)]
pub struct BudgetOutcome {
    pub retrieved_context: String,
    pub used_k: usize,
    pub conversation_context: String,
}

/// Iteratively sizes retrieved + conversational context to the budget.
pub struct ContextBudgetScheduler {
    /// Passages below this relevance score are dropped before concatenation
    /// (unless that would drop everything).
    score_threshold: f64,
    /// Target for conversation summary compaction, in estimated tokens.
    summary_token_limit: usize,
}

impl ContextBudgetScheduler {
    pub fn new(score_threshold: f64, summary_token_limit: usize) -> Self {
        Self { score_threshold, summary_token_limit }
    }

    /// Runs the sizing loop. Never fails: retrieval and compaction problems
    /// degrade to empty/unchanged context and the loop proceeds.
    pub async fn assemble(
        &self,
        estimator: &dyn TokenEstimator,
        retriever: &dyn ContextRetriever,
        store: &dyn ConversationStore,
        summarizer: Option<&dyn Summarizer>,
        req: BudgetRequest<'_>,
    ) -> BudgetOutcome {
        let mut k = req.desired_k.max(req.min_k);
        let min_k = req.min_k.max(1);
        let mut conversation = req.conversation_context;
        let query_tokens = estimator.estimate(req.query);
        let mut summarize_attempted = false;

        let mut retrieved;
        loop {
            retrieved = self.retrieve_context(retriever, req.query, k).await;

            let total = estimator.estimate(&conversation)
                + estimator.estimate(&retrieved)
                + query_tokens;
            if total <= req.available_tokens {
                break;
            }
            debug!(
                target: "chat_pipeline::budget",
                k,
                total,
                available = req.available_tokens,
                "over budget"
            );

            // One compaction attempt per call; a failure counts as "no
            // compaction happened" and the loop falls through to k-decrement.
            if req.include_history && !summarize_attempted {
                if let Some(summarizer) = summarizer {
                    summarize_attempted = true;
                    match store
                        .ensure_summary_limit(req.session_id, Some(summarizer), self.summary_token_limit)
                        .await
                    {
                        Ok(()) => match store.context(req.session_id).await {
                            Ok(refreshed) => {
                                conversation = refreshed;
                                let total = estimator.estimate(&conversation)
                                    + estimator.estimate(&retrieved)
                                    + query_tokens;
                                if total <= req.available_tokens {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(
                                    target: "chat_pipeline::budget",
                                    error = %e,
                                    "context refresh failed after compaction"
                                );
                            }
                        },
                        Err(e) => {
                            warn!(
                                target: "chat_pipeline::budget",
                                error = %e,
                                "summary compaction failed"
                            );
                        }
                    }
                }
            }

            if k > min_k {
                k -= 1;
                continue;
            }

            // Terminal branch: carve out whatever room is left for the
            // retrieved text, squeezing the conversation first if it alone
            // exhausts the budget. This branch always terminates the loop,
            // even if rounding leaves the total slightly over.
            let mut allowed = req
                .available_tokens
                .saturating_sub(estimator.estimate(&conversation) + query_tokens);
            if allowed == 0 {
                let keep_chars = (req.available_tokens / 2) * 4;
                conversation = trailing_chars(&conversation, keep_chars);
                allowed = req
                    .available_tokens
                    .saturating_sub(estimator.estimate(&conversation) + query_tokens);
            }

            let char_limit = allowed * 4;
            if char_limit < retrieved.chars().count() {
                retrieved = leading_chars(&retrieved, char_limit);
            }
            break;
        }

        BudgetOutcome {
            retrieved_context: retrieved,
            used_k: k,
            conversation_context: conversation,
        }
    }

    /// Retrieves at `k` and concatenates passages over the score threshold;
    /// if the threshold excludes everything, falls back to the raw top-k.
    /// Retrieval failure yields an empty context (not fatal).
    async fn retrieve_context(
        &self,
        retriever: &dyn ContextRetriever,
        query: &str,
        k: usize,
    ) -> String {
        let hits = match retriever.retrieve(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    target: "chat_pipeline::budget",
                    error = %e,
                    "retrieval unavailable, using empty context"
                );
                return String::new();
            }
        };

        let mut parts: Vec<&str> = hits
            .iter()
            .filter(|h| h.score > self.score_threshold)
            .map(|h| h.text.as_str())
            .collect();
        if parts.is_empty() && !hits.is_empty() {
            parts = hits.iter().take(k).map(|h| h.text.as_str()).collect();
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::CharTokenEstimator;
    use conversation_store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Retriever returning `k` passages of a fixed size each.
    struct SizedRetriever {
        passage_chars: usize,
        score: f64,
        calls: AtomicUsize,
    }

    impl SizedRetriever {
        fn new(passage_chars: usize, score: f64) -> Self {
            Self { passage_chars, score, calls: AtomicUsize::new(0) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ContextRetriever for SizedRetriever {
        fn retrieve<'a>(
            &'a self,
            _query: &'a str,
            k: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, PipelineError>> + Send + 'a>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let hits: Vec<ScoredPassage> = (0..k)
                .map(|index| ScoredPassage {
                    index,
                    text: "p".repeat(self.passage_chars),
                    score: self.score,
                })
                .collect();
            Box::pin(async move { Ok(hits) })
        }
    }

    /// Retriever that always fails.
    struct DownRetriever;

    impl ContextRetriever for DownRetriever {
        fn retrieve<'a>(
            &'a self,
            _query: &'a str,
            _k: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, PipelineError>> + Send + 'a>>
        {
            Box::pin(async {
                Err(PipelineError::Generation("index offline".into()))
            })
        }
    }

    fn request<'a>(available: usize, conversation: String) -> BudgetRequest<'a> {
        BudgetRequest {
            session_id: "s1",
            query: "what is article 21",
            conversation_context: conversation,
            desired_k: 5,
            min_k: 1,
            available_tokens: available,
            include_history: false,
        }
    }

    #[tokio::test]
    async fn fits_on_first_try() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(40, 0.9);
        let store = MemoryStore::default();

        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, None, request(5000, String::new()))
            .await;

        assert_eq!(out.used_k, 5);
        assert_eq!(retriever.call_count(), 1);
        // 5 passages, blank-line separated.
        assert_eq!(out.retrieved_context.matches("\n\n").count(), 4);
    }

    #[tokio::test]
    async fn two_decrements_reports_used_k_three() {
        // Each passage estimates to 100 tokens, separators add a little;
        // query is 4 tokens. A budget of 340 fits 3 passages (301 + 4) but
        // not 4 (401 + 4) or 5 (502 + 4).
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(400, 0.9);
        let store = MemoryStore::default();

        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, None, request(340, String::new()))
            .await;

        assert_eq!(out.used_k, 3);
        assert_eq!(retriever.call_count(), 3);
        let estimator = CharTokenEstimator;
        let total = estimator.estimate(&out.conversation_context)
            + estimator.estimate(&out.retrieved_context)
            + estimator.estimate("what is article 21");
        assert!(total <= 340);
    }

    #[tokio::test]
    async fn terminates_within_bound_and_truncates_at_min_k() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(4000, 0.9);
        let store = MemoryStore::default();

        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, None, request(100, String::new()))
            .await;

        assert_eq!(out.used_k, 1);
        // desired_k - min_k + 1 retrievals, no more.
        assert_eq!(retriever.call_count(), 5);
        // Terminal branch: retrieved hard-truncated to the remaining budget.
        let estimator = CharTokenEstimator;
        let allowed = 100 - estimator.estimate("what is article 21");
        assert_eq!(out.retrieved_context.chars().count(), allowed * 4);
    }

    #[tokio::test]
    async fn oversized_conversation_is_squeezed_in_terminal_branch() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(400, 0.9);
        let store = MemoryStore::default();

        // Conversation alone exceeds the whole budget.
        let conversation = "c".repeat(4000);
        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, None, request(100, conversation))
            .await;

        assert_eq!(out.used_k, 1);
        // Conversation clamped to half the available budget in chars, then
        // the retrieved text gets whatever tokens remain.
        assert_eq!(out.conversation_context.chars().count(), (100 / 2) * 4);
        let remaining = 100 - 50 - CharTokenEstimator.estimate("what is article 21");
        assert_eq!(out.retrieved_context.chars().count(), remaining * 4);
    }

    #[tokio::test]
    async fn low_scores_fall_back_to_raw_top_k() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(20, 0.05);
        let store = MemoryStore::default();

        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, None, request(5000, String::new()))
            .await;

        // Every passage is under the threshold, yet the raw top-k is used.
        assert!(!out.retrieved_context.is_empty());
        assert_eq!(out.retrieved_context.matches("\n\n").count(), 4);
    }

    struct TinySummarizer;

    impl Summarizer for TinySummarizer {
        fn summarize_exchange<'a>(
            &'a self,
            _query: &'a str,
            _response: &'a str,
        ) -> conversation_store::StoreFuture<'a, String> {
            Box::pin(async { Ok("short".to_string()) })
        }

        fn compress<'a>(
            &'a self,
            _summary: &'a str,
            _max: usize,
        ) -> conversation_store::StoreFuture<'a, String> {
            Box::pin(async { Ok("compact history".to_string()) })
        }
    }

    #[tokio::test]
    async fn summarization_brings_turn_within_budget_without_dropping_k() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let retriever = SizedRetriever::new(40, 0.9);
        let store = MemoryStore::new(5);

        // Build a session whose rendered context is far over the 500-token
        // compaction target.
        let sid = {
            let sid = store.create_session().await.unwrap();
            for i in 0..5 {
                store
                    .add_exchange(&sid, &format!("q{i}"), &"a".repeat(1200), None, None)
                    .await
                    .unwrap();
            }
            sid
        };
        let conversation = store.context(&sid).await.unwrap();
        assert!(CharTokenEstimator.estimate(&conversation) > 500);

        let req = BudgetRequest {
            session_id: &sid,
            query: "what is article 21",
            conversation_context: conversation,
            desired_k: 5,
            min_k: 1,
            available_tokens: 400,
            include_history: true,
        };
        let out = scheduler
            .assemble(&CharTokenEstimator, &retriever, &store, Some(&TinySummarizer), req)
            .await;

        // Compaction alone was enough: k never decremented.
        assert_eq!(out.used_k, 5);
        assert!(out.conversation_context.contains("compact history"));
        assert_eq!(retriever.call_count(), 1);
    }

    #[tokio::test]
    async fn retrieval_failure_yields_empty_context() {
        let scheduler = ContextBudgetScheduler::new(0.2, 500);
        let store = MemoryStore::default();

        let out = scheduler
            .assemble(&CharTokenEstimator, &DownRetriever, &store, None, request(5000, String::new()))
            .await;

        assert_eq!(out.retrieved_context, "");
        assert_eq!(out.used_k, 5);
    }
}
