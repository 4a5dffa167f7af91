//! Per-turn orchestration.
//!
//! [`ChatPipeline`] is an explicit service object: collaborators are
//! injected at construction, the corpus snapshot arrives via
//! [`ChatPipeline::initialize`], and nothing lives in process globals. Each
//! turn runs the state machine: classify, maybe rewrite, budget, generate,
//! persist, maybe evaluate.
//!
//! The pipeline is safe to share across concurrent turns for *different*
//! sessions (retrieval state is read-only after initialization). Turns for
//! the same session must be serialized by the caller: context reads and
//! exchange appends are not atomic with respect to each other.

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use conversation_store::{ConversationStore, Sender, Summarizer};
use hybrid_retrieval::{Corpus, FusedHit, HybridRetriever, VectorHit, VectorSearch};

use crate::budget::{BudgetRequest, ContextBudgetScheduler, ContextRetriever, ScoredPassage};
use crate::classify::{TurnClassification, classify};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::estimate::{CharTokenEstimator, TokenEstimator, leading_chars};
use crate::evaluator::{EvaluationReport, Evaluator};
use crate::generator::{ChatMessage, GenOptions, LlmSummarizer, TextGenerator};
use crate::prompt;
use crate::rewrite::{RewriteDecision, RewriteOutcome, RewriteRules, maybe_rewrite};

/// Collaborator bundle injected into the pipeline.
pub struct Collaborators {
    /// Similarity search over the embedded corpus.
    pub vector: Arc<dyn VectorSearch>,
    /// Session/message/summary persistence.
    pub store: Arc<dyn ConversationStore>,
    /// Generator for user-facing answers.
    pub generator: Arc<dyn TextGenerator>,
    /// Generator for short utility calls (rewrites, summaries, judging).
    pub utility: Arc<dyn TextGenerator>,
    /// Optional answer-quality judge.
    pub evaluator: Option<Arc<dyn Evaluator>>,
}

/// Token estimates recorded into turn debug metadata.
#[derive(Debug, Clone, Serialize)]
pub struct TokensEstimate {
    pub conversation: usize,
    pub retrieved: usize,
    pub query: usize,
    pub total_context_allowed: usize,
}

/// Debug metadata for one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnDebug {
    pub conversation_context_preview: String,
    pub retrieved_context_preview: String,
    pub tokens_estimate: TokensEstimate,
    pub used_k: usize,
    pub query_rewritten: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
    pub rewrite_decision: RewriteDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Result of one turn: the response, debug metadata, and the evaluation
/// report when requested and available.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub response: String,
    pub debug: TurnDebug,
    pub evaluation: Option<EvaluationReport>,
}

#[derive(Default)]
struct PipelineState {
    initialized: bool,
    retriever: Option<Arc<HybridRetriever>>,
}

/// The turn orchestrator.
pub struct ChatPipeline {
    config: PipelineConfig,
    estimator: Arc<dyn TokenEstimator>,
    vector: Arc<dyn VectorSearch>,
    store: Arc<dyn ConversationStore>,
    generator: Arc<dyn TextGenerator>,
    utility: Arc<dyn TextGenerator>,
    evaluator: Option<Arc<dyn Evaluator>>,
    summarizer: Option<LlmSummarizer>,
    rules: RewriteRules,
    scheduler: ContextBudgetScheduler,
    state: RwLock<PipelineState>,
}

impl ChatPipeline {
    /// Builds the pipeline around injected collaborators. Call
    /// [`initialize`] with the corpus snapshot before the first turn.
    ///
    /// [`initialize`]: ChatPipeline::initialize
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let summarizer = config
            .summarization_enabled
            .then(|| LlmSummarizer::new(collaborators.utility.clone()));
        let scheduler =
            ContextBudgetScheduler::new(config.score_threshold, config.summary_token_limit);
        Self {
            config,
            estimator: Arc::new(CharTokenEstimator),
            vector: collaborators.vector,
            store: collaborators.store,
            generator: collaborators.generator,
            utility: collaborators.utility,
            evaluator: collaborators.evaluator,
            summarizer,
            rules: RewriteRules::default(),
            scheduler,
            state: RwLock::new(PipelineState::default()),
        }
    }

    /// Swaps the token estimator (the default is the chars/4 heuristic).
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Loads the corpus snapshot and builds the hybrid retriever.
    ///
    /// A degenerate corpus fails lexical construction; the session then runs
    /// vector-only for its entire lifetime (logged, no retry).
    pub async fn initialize(&self, corpus: Arc<Corpus>) -> Result<(), PipelineError> {
        let mut state = self.state.write().await;
        match HybridRetriever::new(corpus.clone(), self.vector.clone()) {
            Ok(retriever) => {
                state.retriever = Some(Arc::new(retriever));
                info!(
                    target: "chat_pipeline",
                    passages = corpus.len(),
                    "hybrid retriever ready"
                );
            }
            Err(e) => {
                state.retriever = None;
                warn!(
                    target: "chat_pipeline",
                    error = %e,
                    "lexical scorer unavailable, falling back to vector-only for this session"
                );
            }
        }
        state.initialized = true;
        Ok(())
    }

    /// Releases retrieval state; subsequent turns fail with
    /// [`PipelineError::NotInitialized`] until re-initialized.
    pub async fn shutdown(&self) {
        let mut state = self.state.write().await;
        state.initialized = false;
        state.retriever = None;
        info!(target: "chat_pipeline", "pipeline shut down");
    }

    /// Whether `initialize` has completed.
    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.initialized
    }

    /// Creates a new conversation session.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn create_session(&self) -> Result<String, PipelineError> {
        Ok(self.store.create_session().await?)
    }

    /// Drops all stored state for a session.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn reset_session(&self, session_id: &str) -> Result<(), PipelineError> {
        Ok(self.store.reset_session(session_id).await?)
    }

    /// Runs one turn.
    ///
    /// # Errors
    /// [`PipelineError::NotInitialized`] before `initialize`; anticipated
    /// collaborator failures (retrieval, persistence, summarization,
    /// evaluation) degrade instead of erroring, and a generation failure
    /// becomes an error-describing response string.
    pub async fn chat(
        &self,
        session_id: &str,
        query: &str,
        include_history: bool,
        evaluate: bool,
    ) -> Result<TurnOutcome, PipelineError> {
        let retriever = {
            let state = self.state.read().await;
            if !state.initialized {
                return Err(PipelineError::NotInitialized);
            }
            TurnRetriever {
                hybrid: state.retriever.clone(),
                vector: self.vector.clone(),
                alpha: self.config.alpha,
            }
        };

        if classify(query) == TurnClassification::Greeting {
            return Ok(self.greeting_turn(session_id, query, evaluate).await);
        }
        self.retrieval_turn(session_id, query, include_history, evaluate, retriever)
            .await
    }

    async fn greeting_turn(&self, session_id: &str, query: &str, evaluate: bool) -> TurnOutcome {
        debug!(
            target: "chat_pipeline",
            %session_id,
            "greeting shortcut, skipping retrieval"
        );

        let response = self.generate_answer(query, "", "").await;
        let debug = TurnDebug {
            conversation_context_preview: String::new(),
            retrieved_context_preview: String::new(),
            tokens_estimate: TokensEstimate {
                conversation: 0,
                retrieved: 0,
                query: self.estimator.estimate(query),
                total_context_allowed: self.config.available_context_tokens(),
            },
            used_k: 0,
            query_rewritten: false,
            original_query: None,
            rewritten_query: None,
            rewrite_decision: RewriteDecision::Skip,
            note: Some("retrieval_skipped_greeting".to_string()),
        };

        // Best-effort persistence of both turn messages.
        if let Err(e) = self
            .store
            .append_message(
                session_id,
                Sender::User,
                query,
                Some(serde_json::json!({ "note": "greeting_user_input" })),
            )
            .await
        {
            warn!(target: "chat_pipeline", error = %e, "greeting user message not persisted");
        }
        if let Err(e) = self
            .store
            .append_message(
                session_id,
                Sender::Assistant,
                &response,
                serde_json::to_value(&debug).ok(),
            )
            .await
        {
            warn!(target: "chat_pipeline", error = %e, "greeting response not persisted");
        }

        let evaluation = self
            .maybe_evaluate(evaluate, session_id, query, &response, "")
            .await;

        TurnOutcome { response, debug, evaluation }
    }

    async fn retrieval_turn(
        &self,
        session_id: &str,
        query: &str,
        include_history: bool,
        evaluate: bool,
        retriever: TurnRetriever,
    ) -> Result<TurnOutcome, PipelineError> {
        let original_query = query.to_string();

        let conversation = if include_history {
            match self.store.context(session_id).await {
                Ok(ctx) => ctx,
                Err(e) => {
                    warn!(
                        target: "chat_pipeline",
                        %session_id,
                        error = %e,
                        "conversation context unavailable"
                    );
                    String::new()
                }
            }
        } else {
            String::new()
        };

        let rewrite = if include_history && !conversation.is_empty() {
            maybe_rewrite(&self.rules, query, &conversation, self.utility.as_ref()).await
        } else {
            RewriteOutcome {
                query: original_query.clone(),
                decision: RewriteDecision::Skip,
            }
        };
        let final_query = rewrite.query;

        let available = self.config.available_context_tokens();
        let outcome = self
            .scheduler
            .assemble(
                self.estimator.as_ref(),
                &retriever,
                self.store.as_ref(),
                self.summarizer_ref(),
                BudgetRequest {
                    session_id,
                    query: &final_query,
                    conversation_context: conversation,
                    desired_k: self.config.desired_k,
                    min_k: self.config.min_k,
                    available_tokens: available,
                    include_history,
                },
            )
            .await;

        debug!(
            target: "chat_pipeline",
            %session_id,
            used_k = outcome.used_k,
            conversation_chars = outcome.conversation_context.chars().count(),
            retrieved_chars = outcome.retrieved_context.chars().count(),
            "context assembled"
        );

        let response = self
            .generate_answer(
                &final_query,
                &outcome.retrieved_context,
                &outcome.conversation_context,
            )
            .await;

        let rewritten = final_query != original_query;
        let debug = TurnDebug {
            conversation_context_preview: leading_chars(&outcome.conversation_context, 1000),
            retrieved_context_preview: leading_chars(&outcome.retrieved_context, 2000),
            tokens_estimate: TokensEstimate {
                conversation: self.estimator.estimate(&outcome.conversation_context),
                retrieved: self.estimator.estimate(&outcome.retrieved_context),
                query: self.estimator.estimate(&final_query),
                total_context_allowed: available,
            },
            used_k: outcome.used_k,
            query_rewritten: rewritten,
            original_query: rewritten.then(|| original_query.clone()),
            rewritten_query: rewritten.then(|| final_query.clone()),
            rewrite_decision: rewrite.decision,
            note: None,
        };

        // The rewritten query is what gets persisted; the original survives
        // only in the debug metadata above.
        if include_history {
            if let Err(e) = self
                .store
                .add_exchange(
                    session_id,
                    &final_query,
                    &response,
                    serde_json::to_value(&debug).ok(),
                    self.summarizer_ref(),
                )
                .await
            {
                warn!(target: "chat_pipeline", %session_id, error = %e, "exchange not persisted");
            }
        } else {
            if let Err(e) = self
                .store
                .append_message(
                    session_id,
                    Sender::User,
                    &final_query,
                    Some(serde_json::json!({
                        "retrieved_context_preview": leading_chars(&outcome.retrieved_context, 500)
                    })),
                )
                .await
            {
                warn!(target: "chat_pipeline", %session_id, error = %e, "user message not persisted");
            }
            if let Err(e) = self
                .store
                .append_message(
                    session_id,
                    Sender::Assistant,
                    &response,
                    serde_json::to_value(&debug).ok(),
                )
                .await
            {
                warn!(target: "chat_pipeline", %session_id, error = %e, "response not persisted");
            }
        }

        let evaluation = self
            .maybe_evaluate(
                evaluate,
                session_id,
                &final_query,
                &response,
                &outcome.retrieved_context,
            )
            .await;

        Ok(TurnOutcome { response, debug, evaluation })
    }

    /// Answer generation. A generator failure degrades to an
    /// error-describing response string; the turn itself still completes.
    async fn generate_answer(
        &self,
        query: &str,
        retrieved_context: &str,
        conversation_context: &str,
    ) -> String {
        let user_prompt = prompt::build_user_prompt(query, retrieved_context, conversation_context);
        match self
            .generator
            .complete(
                Some(prompt::LEGAL_SYSTEM_PROMPT),
                &[ChatMessage::user(user_prompt)],
                GenOptions {
                    temperature: Some(self.config.answer_temperature),
                    max_tokens: Some(self.config.answer_max_tokens),
                },
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                error!(target: "chat_pipeline", error = %e, "answer generation failed");
                format!("Error generating response: {e}")
            }
        }
    }

    async fn maybe_evaluate(
        &self,
        enabled: bool,
        session_id: &str,
        query: &str,
        response: &str,
        context: &str,
    ) -> Option<EvaluationReport> {
        if !enabled {
            return None;
        }
        let evaluator = self.evaluator.as_ref()?;
        match evaluator.evaluate(session_id, query, response, context).await {
            Ok(report) => report,
            Err(e) => {
                warn!(target: "chat_pipeline", %session_id, error = %e, "evaluation failed");
                None
            }
        }
    }

    fn summarizer_ref(&self) -> Option<&dyn Summarizer> {
        self.summarizer.as_ref().map(|s| s as &dyn Summarizer)
    }

    /// Hybrid candidates for side-by-side retrieval comparison; `None` when
    /// the session is running vector-only.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn hybrid_candidates(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Option<Vec<FusedHit>>, PipelineError> {
        let retriever = self.state.read().await.retriever.clone();
        match retriever {
            Some(r) => Ok(Some(r.search(query, k, self.config.alpha).await?)),
            None => Ok(None),
        }
    }

    /// Vector-only candidates for side-by-side retrieval comparison.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn vector_candidates(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<VectorHit>, PipelineError> {
        Ok(self.vector.search(query, k).await?)
    }
}

/// Per-turn retrieval view: hybrid when available, vector-only otherwise.
struct TurnRetriever {
    hybrid: Option<Arc<HybridRetriever>>,
    vector: Arc<dyn VectorSearch>,
    alpha: f64,
}

impl ContextRetriever for TurnRetriever {
    fn retrieve<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredPassage>, PipelineError>> + Send + 'a>> {
        Box::pin(async move {
            match &self.hybrid {
                Some(hybrid) => {
                    debug!(target: "chat_pipeline", k, "hybrid retrieval");
                    let hits = hybrid.search(query, k, self.alpha).await?;
                    Ok(hits
                        .into_iter()
                        .map(|h| ScoredPassage { index: h.index, text: h.text, score: h.score })
                        .collect())
                }
                None => {
                    debug!(target: "chat_pipeline", k, "vector-only retrieval");
                    let hits = self.vector.search(query, k).await?;
                    Ok(hits
                        .into_iter()
                        .map(|h| ScoredPassage {
                            index: h.index,
                            text: h.text,
                            score: f64::from(h.score),
                        })
                        .collect())
                }
            }
        })
    }
}
