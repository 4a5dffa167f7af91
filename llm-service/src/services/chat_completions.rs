//! OpenAI-compatible chat-completions client.
//!
//! Minimal, non-streaming client around `POST {endpoint}/v1/chat/completions`.
//! Groq's hosted API and OpenAI proper both speak this protocol, so a single
//! service covers every supported provider.
//!
//! Constructor validation:
//! - `cfg.model` must be non-empty
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via the unified types in `error_handler`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{
    LlmServiceError, ProviderError, ProviderErrorKind, Result, make_snippet,
};

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message in a chat-completions request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Per-call sampling overrides; `None` falls back to the profile default.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Thin client for one configured chat-completions endpoint.
///
/// Keeps a preconfigured `reqwest::Client` (timeout + default headers).
#[derive(Debug)]
pub struct ChatCompletionsService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl ChatCompletionsService {
    /// Creates a new service from the given config.
    ///
    /// # Errors
    /// Propagates validation failures from [`LlmModelConfig::validate`] and
    /// [`LlmServiceError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        cfg.validate()?;
        let api_key = cfg.api_key.clone().unwrap_or_default();

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                ProviderError::new(ProviderErrorKind::Decode(format!(
                    "invalid API key header: {e}"
                )))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url_chat = format!("{base}/v1/chat/completions");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(60),
            "ChatCompletionsService initialized"
        );

        Ok(Self { client, cfg, url_chat })
    }

    /// Performs a non-streaming chat completion.
    ///
    /// `options` overrides the profile's temperature/max_tokens for this
    /// call only; the rewrite path runs much colder and shorter than answer
    /// generation.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`LlmServiceError::HttpTransport`] for client/network failures
    /// - [`ProviderErrorKind::Decode`] if the JSON cannot be parsed
    /// - [`ProviderErrorKind::EmptyChoices`] if no choices are returned
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: GenOptions,
    ) -> Result<String> {
        let started = Instant::now();
        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages,
            temperature: options.temperature.or(self.cfg.temperature),
            max_tokens: options.max_tokens.or(self.cfg.max_tokens),
            top_p: self.cfg.top_p,
            stream: false,
        };

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            temperature = ?body.temperature,
            max_tokens = ?body.max_tokens,
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "chat completion returned non-success status"
            );

            return Err(ProviderError::new(ProviderErrorKind::HttpStatus {
                status,
                url,
                snippet,
            })
            .into());
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            LlmServiceError::from(ProviderError::new(ProviderErrorKind::Decode(format!(
                "serde error: {e}; expected `choices[0].message.content`"
            ))))
        })?;

        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| ProviderError::new(ProviderErrorKind::EmptyChoices))?;

        debug!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            output_len = content.len(),
            "chat completion ok"
        );

        Ok(content)
    }

    /// Config this service was built from.
    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<OutMessage>,
}

#[derive(Deserialize)]
struct OutMessage {
    content: String,
}
