//! Turn classification.
//!
//! A query reaches the greeting shortcut only when it looks like a greeting
//! AND does not look informational; any informational signal wins.

/// Classification of an incoming turn. Derived per query, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnClassification {
    Greeting,
    Informational,
}

/// Single-word greetings.
const GREETING_WORDS: [&str; 7] = ["hi", "hey", "hello", "yo", "thanks", "thx", "bye"];

/// Short polite phrases treated as greetings.
const GREETING_PHRASES: [&str; 5] = [
    "good morning",
    "good night",
    "good evening",
    "thank you",
    "thanks a lot",
];

/// Keywords that mark a query as informational regardless of length.
const LEGAL_KEYWORDS: [&str; 23] = [
    "article",
    "section",
    "act",
    "law",
    "rights",
    "ipc",
    "judgment",
    "judgement",
    "court",
    "statute",
    "contract",
    "evidence",
    "penalty",
    "fine",
    "offence",
    "crime",
    "liable",
    "liability",
    "divorce",
    "marriage",
    "custody",
    "writ",
    "injunction",
];

/// True when the query is a bare greeting or polite phrase.
pub fn is_greeting(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return false;
    }
    if q.split_whitespace().count() == 1 && GREETING_WORDS.contains(&q.as_str()) {
        return true;
    }
    GREETING_PHRASES.contains(&q.as_str())
}

/// True when the query asks for information: a question mark, substantial
/// length, or any legal keyword.
pub fn is_informational(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return false;
    }
    if q.contains('?') {
        return true;
    }
    if q.chars().count() > 40 {
        return true;
    }
    LEGAL_KEYWORDS.iter().any(|kw| q.contains(kw))
}

/// Routing decision for a turn. Informational always overrides Greeting.
pub fn classify(query: &str) -> TurnClassification {
    if is_greeting(query) && !is_informational(query) {
        TurnClassification::Greeting
    } else {
        TurnClassification::Informational
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_greeting_is_greeting() {
        assert_eq!(classify("hi"), TurnClassification::Greeting);
        assert_eq!(classify("  Hello "), TurnClassification::Greeting);
        assert_eq!(classify("thank you"), TurnClassification::Greeting);
        assert_eq!(classify("thanks a lot"), TurnClassification::Greeting);
    }

    #[test]
    fn informational_overrides_greeting() {
        // Contains a greeting token but also a question mark and a keyword.
        assert_eq!(
            classify("hi, what is Article 21?"),
            TurnClassification::Informational
        );
    }

    #[test]
    fn question_mark_is_informational() {
        assert!(is_informational("really?"));
    }

    #[test]
    fn long_queries_are_informational() {
        let q = "tell me everything you know about this topic please";
        assert!(is_informational(q));
    }

    #[test]
    fn legal_keyword_is_informational() {
        assert!(is_informational("divorce process"));
        assert!(!is_informational("nice weather"));
    }

    #[test]
    fn greeting_words_inside_sentences_do_not_count() {
        // Two words, not a known phrase, no informational signal.
        assert_eq!(classify("hi there"), TurnClassification::Informational);
    }
}
