//! Reciprocal-rank fusion of per-source rankings.
//!
//! `fused(i) = Σ weight(source) / (RRF_CONSTANT + rank + 1)` over every
//! source whose truncated ranking contains passage `i`. Ties keep source
//! encounter order: the first source to mention a passage wins.

use std::collections::HashMap;

/// Standard RRF smoothing constant.
pub const RRF_CONSTANT: f64 = 60.0;

/// One ranked list contributed by a retrieval source.
///
/// `indices` must already be truncated to the window the caller wants to
/// consider (top-3k in the hybrid retriever); rank is the 0-based position.
pub struct RankedSource<'a> {
    /// Blend weight for this source (1.0 for lexical, alpha for vector).
    pub weight: f64,
    /// Passage indices in descending score order.
    pub indices: &'a [usize],
}

/// Fuses the given sources into a single descending-score ranking.
///
/// Indices at or beyond `corpus_len` are dropped, so the fused result can
/// never reference a passage outside the corpus. The output length is at
/// most `corpus_len`.
pub fn reciprocal_rank_fuse(sources: &[RankedSource<'_>], corpus_len: usize) -> Vec<(usize, f64)> {
    // Accumulate in first-appearance order; the stable sort below then keeps
    // that order for equal scores.
    let mut order: Vec<(usize, f64)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();

    for source in sources {
        for (rank, &idx) in source.indices.iter().enumerate() {
            if idx >= corpus_len {
                continue;
            }
            let contribution = source.weight / (RRF_CONSTANT + rank as f64 + 1.0);
            match slot.get(&idx) {
                Some(&pos) => order[pos].1 += contribution,
                None => {
                    slot.insert(idx, order.len());
                    order.push((idx, contribution));
                }
            }
        }
    }

    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_zero_in_both_sources_dominates() {
        let lexical = [0usize, 1, 2];
        let vector = [0usize, 2, 1];
        for alpha in [0.1, 0.5, 0.9] {
            let fused = reciprocal_rank_fuse(
                &[
                    RankedSource { weight: 1.0, indices: &lexical },
                    RankedSource { weight: alpha, indices: &vector },
                ],
                3,
            );
            assert_eq!(fused[0].0, 0, "alpha={alpha}");
        }
    }

    #[test]
    fn ties_keep_first_appearance_order() {
        // Two disjoint single-entry sources with equal weight produce equal
        // scores; the lexical (first) source's passage must come first.
        let fused = reciprocal_rank_fuse(
            &[
                RankedSource { weight: 1.0, indices: &[4] },
                RankedSource { weight: 1.0, indices: &[7] },
            ],
            10,
        );
        assert_eq!(fused[0].0, 4);
        assert_eq!(fused[1].0, 7);
        assert_eq!(fused[0].1, fused[1].1);
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let fused = reciprocal_rank_fuse(
            &[RankedSource { weight: 1.0, indices: &[0, 9, 1] }],
            2,
        );
        let indices: Vec<usize> = fused.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn contributions_sum_across_sources() {
        let fused = reciprocal_rank_fuse(
            &[
                RankedSource { weight: 1.0, indices: &[3] },
                RankedSource { weight: 0.5, indices: &[3] },
            ],
            5,
        );
        assert_eq!(fused.len(), 1);
        let expected = 1.0 / 61.0 + 0.5 / 61.0;
        assert!((fused[0].1 - expected).abs() < 1e-12);
    }
}
