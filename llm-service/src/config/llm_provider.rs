/// Hosted backend used for chat completions.
///
/// Every supported provider speaks the OpenAI-compatible
/// `/v1/chat/completions` protocol; the variant mostly selects the default
/// endpoint and authentication expectations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// Groq's hosted inference API (`https://api.groq.com/openai`).
    Groq,
    /// Any other OpenAI-compatible endpoint (OpenAI itself, vLLM, ...).
    OpenAiCompatible,
}

impl LlmProvider {
    /// Default API base for the provider, without the `/v1/...` suffix.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::Groq => "https://api.groq.com/openai",
            LlmProvider::OpenAiCompatible => "https://api.openai.com",
        }
    }
}
