//! Follow-up query rewriting.
//!
//! An ordered rule table decides whether a short query depends on preceding
//! turns and must be rewritten standalone before retrieval. Rules fire in
//! order; the first skip-rule that matches ends the evaluation, and only
//! queries with strong follow-up indicators ever reach the model.

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::estimate::trailing_chars;
use crate::generator::{ChatMessage, GenOptions, TextGenerator};

/// What happened to the query on this turn. Logged into turn debug metadata
/// only, never persisted with the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteDecision {
    /// A skip rule fired; the query goes through unchanged.
    Skip,
    /// The model was asked but failed; original query kept.
    Attempted,
    /// The rewrite was accepted.
    Applied,
    /// The rewrite was produced but discarded by the safety check.
    Reverted,
}

/// Result of the rewrite heuristic.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub query: String,
    pub decision: RewriteDecision,
}

/// Ordered, versioned rule table. Patterns are compiled once at
/// construction; precedence is exactly the field order used by
/// [`maybe_rewrite`].
pub struct RewriteRules {
    pub version: u32,
    max_query_words: usize,
    informational_starters: &'static [&'static str],
    domain_terms: &'static [&'static str],
    follow_up_patterns: Vec<Regex>,
    context_tail_chars: usize,
    max_growth_factor: usize,
}

const INFORMATIONAL_STARTERS: [&str; 15] = [
    "explain", "what is", "what are", "what was", "what does", "who", "when", "where", "why",
    "how", "which", "define", "describe", "list", "tell me about",
];

const DOMAIN_TERMS: [&str; 13] = [
    "article",
    "section",
    "act",
    "ipc",
    "crpc",
    "constitution",
    "amendment",
    "schedule",
    "panchayat",
    "fundamental rights",
    "directive principles",
    "udhr",
    "iccpr",
];

const FOLLOW_UP_PATTERNS: [&str; 7] = [
    r"\bthat\b",
    r"\bthis\b",
    r"\bthose\b",
    r"\bit\b",
    r"\bthem\b",
    r"^(more|another)",
    r"^(give|show|provide)\s+(me\s+)?(examples?|details?)",
];

impl Default for RewriteRules {
    fn default() -> Self {
        Self {
            version: 1,
            max_query_words: 15,
            informational_starters: &INFORMATIONAL_STARTERS,
            domain_terms: &DOMAIN_TERMS,
            follow_up_patterns: FOLLOW_UP_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("static pattern"))
                .collect(),
            context_tail_chars: 800,
            max_growth_factor: 2,
        }
    }
}

impl RewriteRules {
    /// True when the query carries a strong follow-up indicator (rule 5).
    fn has_follow_up_indicator(&self, query_lower: &str) -> bool {
        self.follow_up_patterns.iter().any(|p| p.is_match(query_lower))
    }
}

/// Applies the rewrite heuristic. Never fails: every failure path returns
/// the original query together with the decision taken.
pub async fn maybe_rewrite(
    rules: &RewriteRules,
    query: &str,
    conversation_context: &str,
    generator: &dyn TextGenerator,
) -> RewriteOutcome {
    let skip = |reason: &str| {
        debug!(target: "chat_pipeline::rewrite", reason, "skipping rewrite");
        RewriteOutcome { query: query.to_string(), decision: RewriteDecision::Skip }
    };

    // Rule 1: nothing to resolve pronouns against.
    if conversation_context.is_empty() {
        return skip("no conversation context");
    }

    // Rule 2: long queries are already self-contained.
    let query_words = query.split_whitespace().count();
    if query_words > rules.max_query_words {
        return skip("query already detailed");
    }

    let query_lower = query.trim().to_lowercase();

    // Rule 3: informational starters open a new topic.
    if rules
        .informational_starters
        .iter()
        .any(|s| query_lower.starts_with(s))
    {
        return skip("informational starter");
    }

    // Rule 4: specific legal terms make the query standalone.
    if rules.domain_terms.iter().any(|t| query_lower.contains(t)) {
        return skip("contains specific legal term");
    }

    // Rule 5: only strong follow-up indicators justify a model call.
    if !rules.has_follow_up_indicator(&query_lower) {
        return skip("no strong follow-up indicators");
    }

    debug!(target: "chat_pipeline::rewrite", "follow-up detected, attempting rewrite");

    let tail = trailing_chars(conversation_context, rules.context_tail_chars);
    let prompt = format!(
        "You are rewriting a follow-up legal question to be self-contained.\n\n\
         Previous conversation (last 2 turns):\n{tail}\n\n\
         User's follow-up: {query}\n\n\
         Rules:\n\
         1. If the query references \"that\", \"this\", \"it\", replace with the actual topic from conversation\n\
         2. Preserve exact legal terminology (Article numbers, act names, constitutional terms)\n\
         3. Keep it concise (max 20 words)\n\
         4. If already clear, return unchanged\n\n\
         Rewritten question:"
    );

    let rewritten = match generator
        .complete(
            None,
            &[ChatMessage::user(prompt)],
            GenOptions { temperature: Some(0.05), max_tokens: Some(50) },
        )
        .await
    {
        Ok(out) => out.trim().to_string(),
        Err(e) => {
            warn!(target: "chat_pipeline::rewrite", error = %e, "rewrite failed, using original");
            return RewriteOutcome {
                query: query.to_string(),
                decision: RewriteDecision::Attempted,
            };
        }
    };

    // Safety check: a rewrite that balloons past twice the original length
    // has drifted from the user's question.
    if rewritten.split_whitespace().count() > query_words * rules.max_growth_factor {
        debug!(target: "chat_pipeline::rewrite", "rewrite too verbose, using original");
        return RewriteOutcome {
            query: query.to_string(),
            decision: RewriteDecision::Reverted,
        };
    }

    debug!(
        target: "chat_pipeline::rewrite",
        original = query,
        rewritten = rewritten.as_str(),
        "query rewritten"
    );
    RewriteOutcome { query: rewritten, decision: RewriteDecision::Applied }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Generator returning a fixed rewrite (or failing).
    struct FixedGenerator {
        output: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedGenerator {
        fn ok(output: &'static str) -> Self {
            Self { output: Some(output), calls: AtomicUsize::new(0) }
        }

        fn failing() -> Self {
            Self { output: None, calls: AtomicUsize::new(0) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextGenerator for FixedGenerator {
        fn complete<'a>(
            &'a self,
            _system: Option<&'a str>,
            _messages: &'a [ChatMessage],
            _options: GenOptions,
        ) -> GenFuture<'a> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match self.output {
                    Some(out) => Ok(out.to_string()),
                    None => Err(crate::error::PipelineError::Generation("down".into())),
                }
            })
        }
    }

    const CONTEXT: &str = "User: explain article 21\nAssistant: It protects the right to life.";

    #[tokio::test]
    async fn no_context_skips_without_model_call() {
        let generator = FixedGenerator::ok("anything");
        let out = maybe_rewrite(&RewriteRules::default(), "it is", "", &generator).await;
        assert_eq!(out.decision, RewriteDecision::Skip);
        assert_eq!(out.query, "it is");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn long_query_skips() {
        let generator = FixedGenerator::ok("anything");
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        let out = maybe_rewrite(&RewriteRules::default(), long, CONTEXT, &generator).await;
        assert_eq!(out.decision, RewriteDecision::Skip);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn informational_starter_beats_pronoun_rule() {
        // "explain that article" contains the pronoun "that" but starts with
        // "explain": rule 3 must fire first and skip the rewrite.
        let generator = FixedGenerator::ok("should never be used");
        let out =
            maybe_rewrite(&RewriteRules::default(), "explain that article", CONTEXT, &generator)
                .await;
        assert_eq!(out.decision, RewriteDecision::Skip);
        assert_eq!(out.query, "explain that article");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn domain_term_skips() {
        let generator = FixedGenerator::ok("unused");
        let out = maybe_rewrite(&RewriteRules::default(), "more on crpc", CONTEXT, &generator).await;
        assert_eq!(out.decision, RewriteDecision::Skip);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn pronoun_triggers_rewrite_attempt() {
        let generator = FixedGenerator::ok("what is article 21");
        let out = maybe_rewrite(&RewriteRules::default(), "it is", CONTEXT, &generator).await;
        assert_eq!(out.decision, RewriteDecision::Applied);
        assert_eq!(out.query, "what is article 21");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn verbose_rewrite_is_reverted() {
        // Original has 2 words; anything over 4 words must be discarded.
        let generator = FixedGenerator::ok("this rewrite is far far too long to accept");
        let out = maybe_rewrite(&RewriteRules::default(), "it is", CONTEXT, &generator).await;
        assert_eq!(out.decision, RewriteDecision::Reverted);
        assert_eq!(out.query, "it is");
    }

    #[tokio::test]
    async fn accepted_rewrite_obeys_word_bound() {
        let generator = FixedGenerator::ok("give article 21 examples");
        let out = maybe_rewrite(&RewriteRules::default(), "give me examples", CONTEXT, &generator)
            .await;
        assert_eq!(out.decision, RewriteDecision::Applied);
        assert!(
            out.query.split_whitespace().count()
                <= "give me examples".split_whitespace().count() * 2
        );
    }

    #[tokio::test]
    async fn generator_failure_keeps_original() {
        let generator = FixedGenerator::failing();
        let out = maybe_rewrite(&RewriteRules::default(), "show me details", CONTEXT, &generator)
            .await;
        assert_eq!(out.decision, RewriteDecision::Attempted);
        assert_eq!(out.query, "show me details");
    }

    #[tokio::test]
    async fn starts_with_more_triggers_attempt() {
        let generator = FixedGenerator::ok("more about privacy rights");
        let out = maybe_rewrite(&RewriteRules::default(), "more please", CONTEXT, &generator).await;
        assert_eq!(out.decision, RewriteDecision::Applied);
    }
}
