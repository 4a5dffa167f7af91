//! Text generation collaborator contract and the profile-backed adapters.

use std::{future::Future, pin::Pin, sync::Arc};

use conversation_store::{StoreError, StoreFuture, Summarizer};
use llm_service::{GenOptions as SvcGenOptions, LlmServiceProfiles};

use crate::error::PipelineError;

/// Role of a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message handed to the generator.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Per-call sampling options. `None` fields fall back to whatever the
/// implementation's profile defaults are.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Boxed future alias for generator calls.
pub type GenFuture<'a> = Pin<Box<dyn Future<Output = Result<String, PipelineError>> + Send + 'a>>;

/// Synchronous-per-call text generation over a hosted model.
///
/// May block on network I/O and may fail; callers decide whether a failure
/// degrades (in-answer error string) or propagates.
pub trait TextGenerator: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: Option<&'a str>,
        messages: &'a [ChatMessage],
        options: GenOptions,
    ) -> GenFuture<'a>;
}

/// Which llm-service profile an adapter drives.
#[derive(Debug, Clone, Copy)]
enum Profile {
    Generation,
    Utility,
}

/// [`TextGenerator`] backed by an [`LlmServiceProfiles`] profile.
pub struct ProfileTextGenerator {
    svc: Arc<LlmServiceProfiles>,
    profile: Profile,
}

impl ProfileTextGenerator {
    /// Adapter over the generation profile (user-facing answers).
    pub fn generation(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc, profile: Profile::Generation }
    }

    /// Adapter over the utility profile (rewrites, summaries, judging).
    pub fn utility(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc, profile: Profile::Utility }
    }
}

impl TextGenerator for ProfileTextGenerator {
    fn complete<'a>(
        &'a self,
        system: Option<&'a str>,
        messages: &'a [ChatMessage],
        options: GenOptions,
    ) -> GenFuture<'a> {
        Box::pin(async move {
            let mut msgs: Vec<llm_service::ChatMessage> = Vec::with_capacity(messages.len() + 1);
            if let Some(system) = system {
                msgs.push(llm_service::ChatMessage::system(system));
            }
            for m in messages {
                msgs.push(match m.role {
                    Role::System => llm_service::ChatMessage::system(m.content.clone()),
                    Role::User => llm_service::ChatMessage::user(m.content.clone()),
                    Role::Assistant => llm_service::ChatMessage {
                        role: llm_service::ChatRole::Assistant,
                        content: m.content.clone(),
                    },
                });
            }
            let opts = SvcGenOptions {
                temperature: options.temperature,
                max_tokens: options.max_tokens,
            };
            let out = match self.profile {
                Profile::Generation => self.svc.complete_generation(&msgs, opts).await?,
                Profile::Utility => self.svc.complete_utility(&msgs, opts).await?,
            };
            Ok(out)
        })
    }
}

/// [`Summarizer`] implementation that runs the store's summary prompts
/// through a [`TextGenerator`].
pub struct LlmSummarizer {
    generator: Arc<dyn TextGenerator>,
}

impl LlmSummarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

impl Summarizer for LlmSummarizer {
    fn summarize_exchange<'a>(
        &'a self,
        query: &'a str,
        response: &'a str,
    ) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let prompt = format!(
                "Summarize this legal assistant response in under 100 tokens, \
                 preserving key facts and legal points:\n\n\
                 User asked: {query}\n\
                 Assistant answered: {response}\n\n\
                 Concise summary:"
            );
            let out = self
                .generator
                .complete(
                    None,
                    &[ChatMessage::user(prompt)],
                    GenOptions { temperature: Some(0.1), max_tokens: Some(150) },
                )
                .await
                .map_err(|e| StoreError::Summarizer(e.to_string()))?;
            Ok(out.trim().to_string())
        })
    }

    fn compress<'a>(&'a self, summary: &'a str, max_tokens: usize) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let prompt = format!(
                "You are a legal assistant. Compress the following conversation \
                 summary to keep essential legal points and user concerns.\n\
                 Keep the summary under {max_tokens} tokens and preserve key legal \
                 provisions, issues, and conclusions.\n\n\
                 Original summary:\n{summary}\n"
            );
            let out = self
                .generator
                .complete(
                    Some("You are an expert legal summarizer."),
                    &[ChatMessage::user(prompt)],
                    GenOptions {
                        temperature: Some(0.1),
                        max_tokens: Some((max_tokens as u32).max(200)),
                    },
                )
                .await
                .map_err(|e| StoreError::Summarizer(e.to_string()))?;
            Ok(out.trim().to_string())
        })
    }
}
