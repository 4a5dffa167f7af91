//! Shared LLM service with two active profiles: `generation` and `utility`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (endpoint+model+key+timeout).
//! - `generation` produces user-facing answers; `utility` runs the short,
//!   cold calls (query rewrites, exchange summaries, judging).

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::Result;
use crate::services::chat_completions::{ChatCompletionsService, ChatMessage, GenOptions};

/// Shared service managing the `generation` and `utility` profiles.
pub struct LlmServiceProfiles {
    generation: LlmModelConfig,
    utility: LlmModelConfig,
    clients: RwLock<HashMap<ClientKey, Arc<ChatCompletionsService>>>,
}

impl LlmServiceProfiles {
    /// Creates the service. If `utility_opt` is `None`, utility calls reuse
    /// the generation profile.
    pub fn new(generation: LlmModelConfig, utility_opt: Option<LlmModelConfig>) -> Self {
        let utility = utility_opt.unwrap_or_else(|| generation.clone());
        Self {
            generation,
            utility,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Builds both profiles from environment variables.
    ///
    /// # Errors
    /// Propagates configuration errors (missing API key and the like).
    pub fn from_env() -> Result<Self> {
        let generation = crate::config::default_config::generation_from_env()?;
        let utility = crate::config::default_config::utility_from_env()?;
        Ok(Self::new(generation, Some(utility)))
    }

    /// Chat completion on the **generation** profile.
    ///
    /// # Errors
    /// Propagates provider/transport failures.
    pub async fn complete_generation(
        &self,
        messages: &[ChatMessage],
        options: GenOptions,
    ) -> Result<String> {
        let cli = self.get_or_init(&self.generation).await?;
        cli.complete(messages, options).await
    }

    /// Chat completion on the **utility** profile.
    ///
    /// # Errors
    /// Propagates provider/transport failures.
    pub async fn complete_utility(
        &self,
        messages: &[ChatMessage],
        options: GenOptions,
    ) -> Result<String> {
        let cli = self.get_or_init(&self.utility).await?;
        cli.complete(messages, options).await
    }

    async fn get_or_init(&self, cfg: &LlmModelConfig) -> Result<Arc<ChatCompletionsService>> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.clients.read().await.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(ChatCompletionsService::new(cfg.clone())?);
        self.clients.write().await.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Cache key derived from the parts of a config that shape the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout_secs: cfg.timeout_secs,
        }
    }
}
