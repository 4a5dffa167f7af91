//! End-to-end turn flows over mock collaborators.

use std::{future::Future, pin::Pin, sync::Arc};

use chat_pipeline::{
    ChatPipeline, Collaborators, EvaluationReport, EvaluationScores, Evaluator, GenOptions,
    PipelineConfig, PipelineError, TextGenerator,
};
use chat_pipeline::evaluator::{DimensionScore, EvalFuture};
use chat_pipeline::generator::GenFuture;
use conversation_store::{ConversationStore, MemoryStore};
use hybrid_retrieval::{Corpus, RetrievalError, VectorHit, VectorSearch};

/// Vector search over the fixed corpus: similarity decays with index
/// distance from the front.
struct StubVectorSearch {
    corpus: Arc<Corpus>,
}

impl VectorSearch for StubVectorSearch {
    fn search<'a>(
        &'a self,
        _query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VectorHit>, RetrievalError>> + Send + 'a>> {
        let hits: Vec<VectorHit> = self
            .corpus
            .iter()
            .take(k)
            .map(|(index, text)| VectorHit {
                index,
                text: text.to_string(),
                score: 0.9 - index as f32 * 0.05,
            })
            .collect();
        Box::pin(async move { Ok(hits) })
    }
}

struct CannedGenerator(&'static str);

impl TextGenerator for CannedGenerator {
    fn complete<'a>(
        &'a self,
        _system: Option<&'a str>,
        _messages: &'a [chat_pipeline::ChatMessage],
        _options: GenOptions,
    ) -> GenFuture<'a> {
        Box::pin(async move { Ok(self.0.to_string()) })
    }
}

struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn complete<'a>(
        &'a self,
        _system: Option<&'a str>,
        _messages: &'a [chat_pipeline::ChatMessage],
        _options: GenOptions,
    ) -> GenFuture<'a> {
        Box::pin(async { Err(PipelineError::Generation("endpoint unreachable".into())) })
    }
}

struct FixedEvaluator;

impl Evaluator for FixedEvaluator {
    fn evaluate<'a>(
        &'a self,
        session_id: &'a str,
        query: &'a str,
        response: &'a str,
        _context: &'a str,
    ) -> EvalFuture<'a> {
        let dim = |score: f32| DimensionScore { score, reason: "checked".into() };
        let report = EvaluationReport {
            session_id: session_id.to_string(),
            query: query.to_string(),
            response: response.to_string(),
            scores: EvaluationScores {
                factual_accuracy: dim(4.0),
                legal_reasoning: dim(4.0),
                citation_quality: dim(3.0),
                clarity: dim(5.0),
                completeness: dim(4.0),
                overall_score: 4.0,
                summary: "solid".into(),
            },
            created_at: chrono::Utc::now(),
        };
        Box::pin(async move { Ok(Some(report)) })
    }
}

fn corpus() -> Arc<Corpus> {
    Corpus::new(vec![
        "Article 21 protects right to life.".to_string(),
        "Article 14 ensures equality.".to_string(),
        "The UDHR declares universal rights.".to_string(),
    ])
    .into_shared()
}

async fn pipeline_with(
    generator: Arc<dyn TextGenerator>,
    evaluator: Option<Arc<dyn Evaluator>>,
) -> (ChatPipeline, Arc<MemoryStore>) {
    let corpus = corpus();
    let store = Arc::new(MemoryStore::default());
    let pipeline = ChatPipeline::new(
        PipelineConfig::default(),
        Collaborators {
            vector: Arc::new(StubVectorSearch { corpus: corpus.clone() }),
            store: store.clone(),
            generator,
            utility: Arc::new(CannedGenerator("what is article 21")),
            evaluator,
        },
    );
    pipeline.initialize(corpus).await.unwrap();
    (pipeline, store)
}

#[tokio::test]
async fn greeting_shortcut_skips_retrieval() {
    let (pipeline, _store) = pipeline_with(Arc::new(CannedGenerator("Hello!")), None).await;
    let sid = pipeline.create_session().await.unwrap();

    let out = pipeline.chat(&sid, "hi", true, false).await.unwrap();

    assert_eq!(out.response, "Hello!");
    assert_eq!(out.debug.used_k, 0);
    assert_eq!(out.debug.retrieved_context_preview, "");
    assert_eq!(out.debug.note.as_deref(), Some("retrieval_skipped_greeting"));
    assert!(out.evaluation.is_none());
}

#[tokio::test]
async fn greeting_with_question_goes_through_retrieval() {
    let (pipeline, _store) =
        pipeline_with(Arc::new(CannedGenerator("Article 21 answer")), None).await;
    let sid = pipeline.create_session().await.unwrap();

    let out = pipeline
        .chat(&sid, "hi, what is Article 21?", true, false)
        .await
        .unwrap();

    assert!(out.debug.note.is_none());
    assert!(out.debug.used_k >= 1);
    assert!(out.debug.retrieved_context_preview.contains("Article"));
}

#[tokio::test]
async fn exchange_is_persisted_with_history() {
    let (pipeline, store) = pipeline_with(Arc::new(CannedGenerator("answer text")), None).await;
    let sid = pipeline.create_session().await.unwrap();

    pipeline
        .chat(&sid, "what is article 21?", true, false)
        .await
        .unwrap();

    let ctx = store.context(&sid).await.unwrap();
    assert!(ctx.contains("User: what is article 21?"));
}

#[tokio::test]
async fn follow_up_pronoun_is_rewritten_on_second_turn() {
    let (pipeline, _store) = pipeline_with(Arc::new(CannedGenerator("answer text")), None).await;
    let sid = pipeline.create_session().await.unwrap();

    pipeline
        .chat(&sid, "explain article 21 to me", true, false)
        .await
        .unwrap();
    let out = pipeline.chat(&sid, "it is", true, false).await.unwrap();

    assert!(out.debug.query_rewritten);
    assert_eq!(out.debug.original_query.as_deref(), Some("it is"));
    assert_eq!(out.debug.rewritten_query.as_deref(), Some("what is article 21"));
}

#[tokio::test]
async fn generation_failure_becomes_error_response() {
    let (pipeline, _store) = pipeline_with(Arc::new(FailingGenerator), None).await;
    let sid = pipeline.create_session().await.unwrap();

    let out = pipeline
        .chat(&sid, "what is article 21?", true, false)
        .await
        .unwrap();

    assert!(out.response.starts_with("Error generating response:"));
}

#[tokio::test]
async fn evaluation_is_attached_when_requested() {
    let (pipeline, _store) = pipeline_with(
        Arc::new(CannedGenerator("answer")),
        Some(Arc::new(FixedEvaluator)),
    )
    .await;
    let sid = pipeline.create_session().await.unwrap();

    let out = pipeline
        .chat(&sid, "what is article 21?", true, true)
        .await
        .unwrap();

    let report = out.evaluation.expect("evaluation requested");
    assert_eq!(report.session_id, sid);
    assert!((report.scores.overall_score - 4.0).abs() < 1e-6);
}

#[tokio::test]
async fn missing_evaluator_never_blocks_the_turn() {
    let (pipeline, _store) = pipeline_with(Arc::new(CannedGenerator("answer")), None).await;
    let sid = pipeline.create_session().await.unwrap();

    let out = pipeline
        .chat(&sid, "what is article 21?", true, true)
        .await
        .unwrap();

    assert_eq!(out.response, "answer");
    assert!(out.evaluation.is_none());
}

#[tokio::test]
async fn chat_before_initialize_is_rejected() {
    let corpus = corpus();
    let store = Arc::new(MemoryStore::default());
    let pipeline = ChatPipeline::new(
        PipelineConfig::default(),
        Collaborators {
            vector: Arc::new(StubVectorSearch { corpus }),
            store,
            generator: Arc::new(CannedGenerator("answer")),
            utility: Arc::new(CannedGenerator("utility")),
            evaluator: None,
        },
    );

    let err = pipeline.chat("s1", "what is article 21?", true, false).await;
    assert!(matches!(err, Err(PipelineError::NotInitialized)));
}

#[tokio::test]
async fn shutdown_disables_turns() {
    let (pipeline, _store) = pipeline_with(Arc::new(CannedGenerator("answer")), None).await;
    pipeline.shutdown().await;
    let err = pipeline.chat("s1", "what is article 21?", true, false).await;
    assert!(matches!(err, Err(PipelineError::NotInitialized)));
}
