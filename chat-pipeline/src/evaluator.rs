//! LLM-as-judge evaluation of answered turns.
//!
//! The judge scores a response on five dimensions against the retrieved
//! context. Anything that is not valid, fully-structured JSON from the model
//! counts as "no evaluation": the turn result carries `None` and the caller
//! is never blocked.

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PipelineError;
use crate::estimate::leading_chars;
use crate::generator::{ChatMessage, GenOptions, TextGenerator};

/// Score and rationale for one dimension, 1-5 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: f32,
    pub reason: String,
}

/// The five-dimension judgment parsed from model JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub factual_accuracy: DimensionScore,
    pub legal_reasoning: DimensionScore,
    pub citation_quality: DimensionScore,
    pub clarity: DimensionScore,
    pub completeness: DimensionScore,
    pub overall_score: f32,
    pub summary: String,
}

/// One evaluated turn.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub session_id: String,
    pub query: String,
    pub response: String,
    pub scores: EvaluationScores,
    pub created_at: DateTime<Utc>,
}

/// Boxed future alias for evaluator calls.
pub type EvalFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<EvaluationReport>, PipelineError>> + Send + 'a>>;

/// Optional answer-quality collaborator. `Ok(None)` means "no structured
/// judgment available"; hard errors are absorbed by the orchestrator too.
pub trait Evaluator: Send + Sync {
    fn evaluate<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        response: &'a str,
        context: &'a str,
    ) -> EvalFuture<'a>;
}

/// Judge backed by a [`TextGenerator`].
pub struct LlmEvaluator {
    generator: Arc<dyn TextGenerator>,
}

impl LlmEvaluator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(query: &str, response: &str, context: &str) -> String {
        let context_block = if context.is_empty() {
            "No context provided".to_string()
        } else {
            leading_chars(context, 2000)
        };
        format!(
            "You are an expert legal evaluation system. Assess the quality of this legal \
             assistant's response using the query and retrieved legal context as reference.\n\n\
             **USER QUERY:**\n{query}\n\n\
             **RETRIEVED LEGAL CONTEXT (Ground Truth):**\n{context_block}\n\n\
             **AI RESPONSE TO EVALUATE:**\n{response}\n\n\
             Evaluate on 5 dimensions (1-5 scale):\n\n\
             1. **FACTUAL ACCURACY** (1-5): Does the response accurately reflect the legal provisions in the context? Are facts correct?\n\n\
             2. **LEGAL REASONING** (1-5): Is the legal analysis logically sound? Are arguments well-structured?\n\n\
             3. **CITATION QUALITY** (1-5): Are legal sources (articles, acts) properly mentioned and attributed?\n\n\
             4. **CLARITY** (1-5): Is the language clear, professional, and understandable?\n\n\
             5. **COMPLETENESS** (1-5): Does it fully address all aspects of the user's query?\n\n\
             Respond in JSON:\n\
             {{\n\
               \"factual_accuracy\": {{\"score\": X, \"reason\": \"...\"}},\n\
               \"legal_reasoning\": {{\"score\": X, \"reason\": \"...\"}},\n\
               \"citation_quality\": {{\"score\": X, \"reason\": \"...\"}},\n\
               \"clarity\": {{\"score\": X, \"reason\": \"...\"}},\n\
               \"completeness\": {{\"score\": X, \"reason\": \"...\"}},\n\
               \"overall_score\": X.X,\n\
               \"summary\": \"Brief overall assessment\"\n\
             }}\n"
        )
    }
}

impl Evaluator for LlmEvaluator {
    fn evaluate<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        response: &'a str,
        context: &'a str,
    ) -> EvalFuture<'a> {
        Box::pin(async move {
            let prompt = Self::build_prompt(query, response, context);
            let raw = self
                .generator
                .complete(
                    Some("You are a legal evaluation expert. Always respond in valid JSON."),
                    &[ChatMessage::user(prompt)],
                    GenOptions { temperature: Some(0.1), max_tokens: Some(1000) },
                )
                .await?;

            let scores: EvaluationScores = match serde_json::from_str(raw.trim()) {
                Ok(scores) => scores,
                Err(e) => {
                    warn!(
                        target: "chat_pipeline::evaluator",
                        error = %e,
                        "judge output is not structured JSON, dropping evaluation"
                    );
                    return Ok(None);
                }
            };

            Ok(Some(EvaluationReport {
                session_id: session_id.to_string(),
                query: query.to_string(),
                response: response.to_string(),
                scores,
                created_at: Utc::now(),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenFuture;

    struct CannedGenerator(&'static str);

    impl TextGenerator for CannedGenerator {
        fn complete<'a>(
            &'a self,
            _system: Option<&'a str>,
            _messages: &'a [ChatMessage],
            _options: GenOptions,
        ) -> GenFuture<'a> {
            Box::pin(async move { Ok(self.0.to_string()) })
        }
    }

    const GOOD_JSON: &str = r#"{
        "factual_accuracy": {"score": 4, "reason": "matches context"},
        "legal_reasoning": {"score": 5, "reason": "sound"},
        "citation_quality": {"score": 4, "reason": "cites Article 21"},
        "clarity": {"score": 5, "reason": "clear"},
        "completeness": {"score": 4, "reason": "covers the question"},
        "overall_score": 4.4,
        "summary": "Good answer"
    }"#;

    #[tokio::test]
    async fn structured_json_becomes_report() {
        let evaluator = LlmEvaluator::new(Arc::new(CannedGenerator(GOOD_JSON)));
        let report = evaluator
            .evaluate("s1", "what is article 21", "It protects life.", "Article 21 ...")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.session_id, "s1");
        assert!((report.scores.overall_score - 4.4).abs() < 1e-6);
        assert_eq!(report.scores.legal_reasoning.score, 5.0);
    }

    #[tokio::test]
    async fn prose_output_yields_none() {
        let evaluator = LlmEvaluator::new(Arc::new(CannedGenerator("I think it was fine.")));
        let report = evaluator
            .evaluate("s1", "q", "r", "")
            .await
            .unwrap();
        assert!(report.is_none());
    }
}
