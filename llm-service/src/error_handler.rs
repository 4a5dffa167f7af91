//! Unified error handling for `llm-service`.
//!
//! One top-level [`LlmServiceError`] for the whole crate, with domain
//! sub-enums for configuration and provider failures. All messages carry the
//! `[LLM Service]` suffix to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

/// Unified result alias for the crate.
pub type Result<T> = std::result::Result<T, LlmServiceError>;

/// Top-level error for the `llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LlmServiceError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Provider call failures (status, decode, empty output).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Underlying HTTP transport error.
    #[error("[LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}

/// Errors that realistically happen at config load/validation time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (limits, timeouts).
    #[error("[LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// The endpoint is empty or does not start with http/https.
    #[error("[LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Model name was empty.
    #[error("[LLM Service] model name must not be empty")]
    EmptyModel,

    /// The provider requires an API key and none was configured.
    #[error("[LLM Service] missing API key for provider")]
    MissingApiKey,
}

/// Errors surfaced while talking to a provider.
#[derive(Debug, Error)]
#[error("[LLM Service] {kind}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind) -> Self {
        Self { kind }
    }
}

/// Failure modes of a chat-completions call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    /// Upstream returned a non-successful HTTP status.
    #[error("HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The provider returned no choices.
    #[error("empty choices in completion response")]
    EmptyChoices,
}

/// Clamp an upstream error body to a log-friendly snippet.
pub fn make_snippet(body: &str) -> String {
    const MAX: usize = 240;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_is_clamped() {
        let long = "e".repeat(1000);
        let snip = make_snippet(&long);
        assert!(snip.chars().count() <= 241);
        assert!(snip.ends_with('…'));
    }

    #[test]
    fn short_snippet_passes_through() {
        assert_eq!(make_snippet("  bad key  "), "bad key");
    }
}
