use std::{error::Error, sync::Arc};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use api::AppState;
use chat_pipeline::{
    ChatPipeline, Collaborators, LlmEvaluator, PipelineConfig, ProfileTextGenerator,
};
use conversation_store::MemoryStore;
use hybrid_retrieval::Corpus;
use llm_service::LlmServiceProfiles;
use vector_store::{OllamaConfig, OllamaEmbedder, VectorStore, VectorStoreConfig, read_corpus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file.
    // Fails if .env file not found, not readable or invalid.
    dotenvy::dotenv()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // LLM profiles (generation + utility) from env.
    let svc = Arc::new(LlmServiceProfiles::from_env()?);

    // Corpus snapshot: passage indices are fixed from here on.
    let corpus_path =
        std::env::var("CORPUS_JSONL").unwrap_or_else(|_| "data/corpus.jsonl".to_string());
    let corpus = match read_corpus(&corpus_path) {
        Ok(passages) => Corpus::new(passages).into_shared(),
        Err(e) => {
            warn!(error = %e, path = %corpus_path, "corpus not loaded, retrieval will be empty");
            Corpus::new(Vec::new()).into_shared()
        }
    };

    // Vector store over Qdrant with an Ollama embedder.
    let vs_cfg = VectorStoreConfig::from_env();
    let embedder = Arc::new(OllamaEmbedder::new(OllamaConfig {
        url: vs_cfg.embed_url.clone(),
        model: vs_cfg.embed_model.clone(),
        dim: vs_cfg.embedding_dim,
    }));
    let store = Arc::new(VectorStore::new(vs_cfg, embedder, corpus.clone())?);

    let force_rebuild = std::env::var("INDEX_FORCE_REBUILD")
        .map(|v| v == "true")
        .unwrap_or(false);
    match store.ensure_indexed(force_rebuild).await {
        Ok(ingested) => info!(ingested, "vector index ready"),
        Err(e) => error!(error = %e, "vector index unavailable, continuing degraded"),
    }

    // Pipeline with injected collaborators.
    let generator = Arc::new(ProfileTextGenerator::generation(svc.clone()));
    let utility: Arc<ProfileTextGenerator> = Arc::new(ProfileTextGenerator::utility(svc.clone()));
    let pipeline = Arc::new(ChatPipeline::new(
        PipelineConfig::from_env(),
        Collaborators {
            vector: store.clone(),
            store: Arc::new(MemoryStore::default()),
            generator,
            utility: utility.clone(),
            evaluator: Some(Arc::new(LlmEvaluator::new(utility))),
        },
    ));

    if let Err(e) = pipeline.initialize(corpus).await {
        // The service keeps running; turns will be rejected until a restart
        // with a healthy corpus.
        error!(error = %e, "pipeline initialization failed");
    }

    api::start(Arc::new(AppState::new(pipeline))).await?;

    Ok(())
}
