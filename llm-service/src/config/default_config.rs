//! Environment-driven profile construction.
//!
//! Variables (all optional except the API key):
//! - `GROQ_API_KEY` / `LLM_API_KEY` — bearer token
//! - `LLM_ENDPOINT` — API base, default Groq's
//! - `LLM_MODEL` — generation model, default `llama-3.1-8b-instant`
//! - `LLM_UTILITY_MODEL` — rewrite/summary/judge model, defaults to `LLM_MODEL`
//! - `LLM_TIMEOUT_SECS` — per-request timeout, default 60

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{ConfigError, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Reads the generation profile from the environment.
///
/// # Errors
/// [`ConfigError::MissingVar`] if no API key is configured.
pub fn generation_from_env() -> Result<LlmModelConfig> {
    let api_key = env("GROQ_API_KEY")
        .or_else(|| env("LLM_API_KEY"))
        .ok_or(ConfigError::MissingVar("GROQ_API_KEY"))?;

    Ok(LlmModelConfig {
        provider: LlmProvider::Groq,
        model: env("LLM_MODEL").unwrap_or_else(|| "llama-3.1-8b-instant".into()),
        endpoint: env("LLM_ENDPOINT")
            .unwrap_or_else(|| LlmProvider::Groq.default_endpoint().into()),
        api_key: Some(api_key),
        max_tokens: Some(parse("LLM_MAX_TOKENS", 1000u32)),
        temperature: Some(parse("LLM_TEMPERATURE", 0.2f32)),
        top_p: None,
        timeout_secs: Some(parse("LLM_TIMEOUT_SECS", 60u64)),
    })
}

/// Reads the utility profile (rewrites, summaries, judging) from the
/// environment. Shares endpoint and key with the generation profile.
///
/// # Errors
/// [`ConfigError::MissingVar`] if no API key is configured.
pub fn utility_from_env() -> Result<LlmModelConfig> {
    let mut cfg = generation_from_env()?;
    if let Some(model) = env("LLM_UTILITY_MODEL") {
        cfg.model = model;
    }
    // Utility calls are short; keep the default cap low and sampling cold.
    cfg.max_tokens = Some(parse("LLM_UTILITY_MAX_TOKENS", 200u32));
    cfg.temperature = Some(parse("LLM_UTILITY_TEMPERATURE", 0.1f32));
    Ok(cfg)
}
