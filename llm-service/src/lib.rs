//! Chat-completions access for the backend: one client type for every
//! OpenAI-compatible endpoint (Groq hosted by default), profile management
//! and unified errors.

pub mod config;
pub mod error_handler;
pub mod service_profiles;
pub mod services;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{ConfigError, LlmServiceError, ProviderError, ProviderErrorKind};
pub use service_profiles::LlmServiceProfiles;
pub use services::chat_completions::{ChatCompletionsService, ChatMessage, ChatRole, GenOptions};
