//! Runtime configuration for the pipeline, loaded from environment
//! variables with sensible defaults.

/// Config bag for the turn orchestrator. All fields have defaults via
/// [`PipelineConfig::from_env`].
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Model context window, in estimated tokens.
    pub model_max_tokens: usize,
    /// Tokens held back for the model's own response.
    pub reserved_response_tokens: usize,
    /// Passage count the scheduler starts from.
    pub desired_k: usize,
    /// Floor for the k-decrement loop.
    pub min_k: usize,
    /// Vector weight in reciprocal-rank fusion (lexical weight is 1.0).
    pub alpha: f64,
    /// Relevance threshold for including a retrieved passage.
    pub score_threshold: f64,
    /// Compaction target for the conversation summary, in estimated tokens.
    pub summary_token_limit: usize,
    /// Whether assistant responses are summarized into future context.
    pub summarization_enabled: bool,
    /// Sampling temperature for answer generation.
    pub answer_temperature: f32,
    /// Completion cap for answer generation.
    pub answer_max_tokens: u32,
}

impl PipelineConfig {
    /// Build from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            model_max_tokens: parse("MODEL_MAX_TOKENS", 6000usize),
            reserved_response_tokens: parse("RESERVED_RESPONSE_TOKENS", 1000usize),
            desired_k: parse("RETRIEVE_K", 5usize),
            min_k: parse("MIN_RETRIEVE_K", 1usize),
            alpha: parse("FUSION_ALPHA", 0.9f64),
            score_threshold: parse("SCORE_THRESHOLD", 0.2f64),
            summary_token_limit: parse("SUMMARY_TOKEN_LIMIT", 500usize),
            summarization_enabled: env("ENABLE_TURN_SUMMARIZATION", "true") == "true",
            answer_temperature: parse("ANSWER_TEMPERATURE", 0.2f32),
            answer_max_tokens: parse("ANSWER_MAX_TOKENS", 1000u32),
        }
    }

    /// Tokens available for conversation + retrieved context + query, with a
    /// hard floor so a misconfigured reservation cannot starve the prompt.
    pub fn available_context_tokens(&self) -> usize {
        self.model_max_tokens
            .saturating_sub(self.reserved_response_tokens)
            .max(256)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_max_tokens: 6000,
            reserved_response_tokens: 1000,
            desired_k: 5,
            min_k: 1,
            alpha: 0.9,
            score_threshold: 0.2,
            summary_token_limit: 500,
            summarization_enabled: true,
            answer_temperature: 0.2,
            answer_max_tokens: 1000,
        }
    }
}

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_tokens_has_floor() {
        let mut cfg = PipelineConfig::default();
        cfg.model_max_tokens = 100;
        cfg.reserved_response_tokens = 1000;
        assert_eq!(cfg.available_context_tokens(), 256);
    }

    #[test]
    fn defaults_are_consistent() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.available_context_tokens(), 5000);
        assert!(cfg.min_k <= cfg.desired_k);
    }
}
