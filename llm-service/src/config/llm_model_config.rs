use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{ConfigError, Result};

/// Configuration for one chat-completions profile.
///
/// `temperature` and `max_tokens` here are profile *defaults*; individual
/// calls may override them through `GenOptions`.
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    /// Hosted backend (selects default endpoint and auth expectations).
    pub provider: LlmProvider,

    /// Model identifier, e.g. `"llama-3.1-8b-instant"`.
    pub model: String,

    /// API base URL (without `/v1/chat/completions`).
    pub endpoint: String,

    /// API key; required for all supported providers.
    pub api_key: Option<String>,

    /// Default completion token cap.
    pub max_tokens: Option<u32>,

    /// Default sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Validates the fields that every provider call relies on.
    ///
    /// # Errors
    /// - [`ConfigError::EmptyModel`] for a blank model name
    /// - [`ConfigError::InvalidEndpoint`] for a non-http(s) endpoint
    /// - [`ConfigError::MissingApiKey`] when no key is configured
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()).into());
        }
        if self.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Groq,
            model: "llama-3.1-8b-instant".into(),
            endpoint: "https://api.groq.com/openai".into(),
            api_key: Some("gsk_test".into()),
            max_tokens: Some(1000),
            temperature: Some(0.2),
            top_p: None,
            timeout_secs: Some(60),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn blank_model_rejected() {
        let mut cfg = base();
        cfg.model = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_http_endpoint_rejected() {
        let mut cfg = base();
        cfg.endpoint = "ftp://example.com".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_api_key_rejected() {
        let mut cfg = base();
        cfg.api_key = None;
        assert!(cfg.validate().is_err());
    }
}
