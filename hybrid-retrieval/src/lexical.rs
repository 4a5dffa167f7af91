//! BM25 Okapi lexical scorer built once over the full corpus.
//!
//! Scores are term-overlap relevance values computed from raw text, no
//! embeddings involved. The scorer is read-only after construction and safe
//! to share across concurrent sessions.

use std::collections::HashMap;

use tracing::debug;

use crate::corpus::Corpus;
use crate::errors::RetrievalError;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// Stand-in token for passages that tokenize to nothing, so the scorer never
/// sees an empty document.
const SENTINEL_TOKEN: &str = "empty";

/// Lowercase whitespace tokenizer; tokens of length <= 1 are dropped.
///
/// The same rules apply to passages and queries so that term statistics line
/// up. Length is measured in characters, not bytes.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// BM25 Okapi scorer over an immutable corpus snapshot.
///
/// Parameters are k1 = 1.5, b = 0.75 with the epsilon floor applied to
/// negative IDF values (terms occurring in more than half the documents),
/// so common terms contribute a small positive weight instead of flipping
/// the score sign.
pub struct Bm25Scorer {
    doc_term_freq: Vec<HashMap<String, u32>>,
    doc_len: Vec<usize>,
    idf: HashMap<String, f64>,
    avg_doc_len: f64,
}

impl Bm25Scorer {
    /// Builds the scorer from the full corpus.
    ///
    /// Each passage is tokenized once; a passage that yields zero tokens is
    /// replaced by a single sentinel token.
    ///
    /// # Errors
    /// Returns [`RetrievalError::EmptyCorpus`] when the corpus holds no
    /// passages at all.
    pub fn new(corpus: &Corpus) -> Result<Self, RetrievalError> {
        if corpus.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }

        let mut doc_term_freq = Vec::with_capacity(corpus.len());
        let mut doc_len = Vec::with_capacity(corpus.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;

        for (_, text) in corpus.iter() {
            let mut tokens = tokenize(text);
            if tokens.is_empty() {
                tokens.push(SENTINEL_TOKEN.to_string());
            }
            total_len += tokens.len();
            doc_len.push(tokens.len());

            let mut tf: HashMap<String, u32> = HashMap::new();
            for t in tokens {
                *tf.entry(t).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            doc_term_freq.push(tf);
        }

        let n = corpus.len() as f64;
        let avg_doc_len = total_len as f64 / n;

        // Okapi IDF with the epsilon floor: terms in more than half the
        // documents get eps * average_idf instead of a negative weight.
        let mut idf: HashMap<String, f64> = HashMap::with_capacity(doc_freqs.len());
        let mut idf_sum = 0.0;
        let mut negative: Vec<String> = Vec::new();
        for (term, df) in &doc_freqs {
            let val = ((n - *df as f64 + 0.5) / (*df as f64 + 0.5)).ln();
            idf_sum += val;
            if val < 0.0 {
                negative.push(term.clone());
            }
            idf.insert(term.clone(), val);
        }
        let average_idf = idf_sum / idf.len() as f64;
        let floor = EPSILON * average_idf;
        for term in negative {
            idf.insert(term, floor);
        }

        debug!(
            target: "hybrid_retrieval::lexical",
            docs = doc_len.len(),
            vocab = idf.len(),
            "bm25 scorer built"
        );

        Ok(Self {
            doc_term_freq,
            doc_len,
            idf,
            avg_doc_len,
        })
    }

    /// Scores every passage against the query tokens, in corpus order.
    ///
    /// Unknown query terms contribute nothing. An empty token slice yields
    /// all zeros; callers are expected to skip lexical scoring entirely in
    /// that case.
    pub fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        let mut out = vec![0.0; self.doc_term_freq.len()];
        for (i, tf_map) in self.doc_term_freq.iter().enumerate() {
            let dl = self.doc_len[i] as f64;
            let norm = K1 * (1.0 - B + B * dl / self.avg_doc_len);
            let mut score = 0.0;
            for term in query_tokens {
                let Some(&tf) = tf_map.get(term) else {
                    continue;
                };
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                let tf = tf as f64;
                score += idf * (tf * (K1 + 1.0)) / (tf + norm);
            }
            out[i] = score;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Corpus {
        Corpus::new(texts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn tokenize_drops_short_tokens_and_lowercases() {
        let toks = tokenize("A Article 21 IS x life");
        assert_eq!(toks, vec!["article", "21", "is", "life"]);
    }

    #[test]
    fn empty_corpus_rejected() {
        assert!(matches!(
            Bm25Scorer::new(&corpus(&[])),
            Err(RetrievalError::EmptyCorpus)
        ));
    }

    #[test]
    fn blank_passage_gets_sentinel() {
        let scorer = Bm25Scorer::new(&corpus(&["only real document here", "  x  "])).unwrap();
        // Both documents must be represented; scoring an unrelated query
        // returns a value per passage.
        assert_eq!(scorer.scores(&tokenize("nothing matches")).len(), 2);
    }

    #[test]
    fn matching_passage_outranks_non_matching() {
        let scorer = Bm25Scorer::new(&corpus(&[
            "Article 21 protects right to life",
            "Article 14 ensures equality",
        ]))
        .unwrap();
        let scores = scorer.scores(&tokenize("life"));
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn term_in_every_doc_still_scores_positive() {
        let scorer = Bm25Scorer::new(&corpus(&[
            "law protects citizens against arbitrary detention always",
            "law ensures equality before courts nationwide",
            "law guides panchayat governance structures",
        ]))
        .unwrap();
        // "law" occurs in every document: raw IDF is negative, the epsilon
        // floor must keep the contribution positive.
        let scores = scorer.scores(&tokenize("law"));
        assert!(scores.iter().all(|s| *s > 0.0));
    }
}
