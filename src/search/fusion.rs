use std::collections::HashMap;

use crate::error::ConfigurationError;
use crate::models::{FusedResult, ScoredCandidate};

/// Constant offset damping the dominance of rank-1 items in the reciprocal
/// rank sum. A fixed tuning constant, deliberately not user-configurable.
const RRF_K: f32 = 60.0;

/// Merges a semantic ranking and a lexical ranking into one ordered list
/// with Reciprocal Rank Fusion:
///
///   fused(id) = alpha * 1/(K + rank_semantic) + (1-alpha) * 1/(K + rank_lexical)
///
/// A candidate absent from one list contributes nothing for that branch.
/// Rank position is used instead of the raw scores because similarity and
/// term-overlap scores live on non-comparable scales.
#[derive(Debug, Clone, Copy)]
pub struct FusionRanker {
    alpha: f32,
}

fn reciprocal(rank: usize) -> f32 {
    1.0 / (RRF_K + rank as f32)
}

impl FusionRanker {
    /// `alpha` weighs the semantic branch; `1 - alpha` the lexical branch.
    /// Values outside [0, 1] are rejected here, at construction, never at
    /// query time.
    pub fn new(alpha: f32) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&alpha) || alpha.is_nan() {
            return Err(ConfigurationError::AlphaOutOfRange(alpha));
        }
        Ok(Self { alpha })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Highest achievable fused score: rank 1 in both branches.
    pub fn max_score(&self) -> f32 {
        reciprocal(1)
    }

    /// Fuse the two rankings. Output is strictly ordered: descending by
    /// fused score, ties broken by the smaller individual rank, then by id.
    /// Two empty inputs produce an empty output, not an error.
    pub fn fuse(
        &self,
        semantic: &[ScoredCandidate],
        lexical: &[ScoredCandidate],
    ) -> Vec<FusedResult> {
        let mut fused: HashMap<&str, FusedResult> = HashMap::new();

        for (i, candidate) in semantic.iter().enumerate() {
            let rank = i + 1;
            let entry = fused
                .entry(candidate.doc_id.as_str())
                .or_insert_with(|| FusedResult {
                    doc_id: candidate.doc_id.clone(),
                    score: 0.0,
                    semantic_rank: None,
                    lexical_rank: None,
                });
            entry.semantic_rank = Some(rank);
            entry.score += self.alpha * reciprocal(rank);
        }

        for (i, candidate) in lexical.iter().enumerate() {
            let rank = i + 1;
            let entry = fused
                .entry(candidate.doc_id.as_str())
                .or_insert_with(|| FusedResult {
                    doc_id: candidate.doc_id.clone(),
                    score: 0.0,
                    semantic_rank: None,
                    lexical_rank: None,
                });
            entry.lexical_rank = Some(rank);
            entry.score += (1.0 - self.alpha) * reciprocal(rank);
        }

        let mut results: Vec<FusedResult> = fused.into_values().collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.best_rank().cmp(&b.best_rank()))
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(entries: &[(&str, f32)]) -> Vec<ScoredCandidate> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (id, score))| ScoredCandidate {
                doc_id: id.to_string(),
                score: *score,
                rank: i + 1,
            })
            .collect()
    }

    #[test]
    fn test_alpha_validated_at_construction() {
        assert!(FusionRanker::new(0.0).is_ok());
        assert!(FusionRanker::new(1.0).is_ok());
        assert!(matches!(
            FusionRanker::new(1.01),
            Err(ConfigurationError::AlphaOutOfRange(_))
        ));
        assert!(FusionRanker::new(-0.5).is_err());
        assert!(FusionRanker::new(f32::NAN).is_err());
    }

    #[test]
    fn test_both_empty_inputs_yield_empty_output() {
        let ranker = FusionRanker::new(0.7).unwrap();
        assert!(ranker.fuse(&[], &[]).is_empty());
    }

    #[test]
    fn test_output_strictly_ordered() {
        let ranker = FusionRanker::new(0.5).unwrap();
        let semantic = candidates(&[("a", 0.9), ("b", 0.8), ("c", 0.7)]);
        let lexical = candidates(&[("b", 1.0), ("d", 0.5)]);

        let results = ranker.fuse(&semantic, &lexical);
        for pair in results.windows(2) {
            let ordered = pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score
                    && (pair[0].best_rank() < pair[1].best_rank()
                        || (pair[0].best_rank() == pair[1].best_rank()
                            && pair[0].doc_id < pair[1].doc_id)));
            assert!(ordered, "unresolved ordering between {pair:?}");
        }
    }

    #[test]
    fn test_fusion_is_rank_only() {
        // Replacing scores with any order-preserving values must not change
        // the fused output.
        let ranker = FusionRanker::new(0.7).unwrap();
        let semantic_a = candidates(&[("a", 0.99), ("b", 0.42), ("c", 0.01)]);
        let semantic_b = candidates(&[("a", 3.0), ("b", 2.0), ("c", 1.0)]);
        let lexical_a = candidates(&[("c", 1.0), ("a", 0.3)]);
        let lexical_b = candidates(&[("c", 100.0), ("a", 50.0)]);

        let fused_a = ranker.fuse(&semantic_a, &lexical_a);
        let fused_b = ranker.fuse(&semantic_b, &lexical_b);
        assert_eq!(fused_a, fused_b);
    }

    #[test]
    fn test_reinforcement_beats_single_list() {
        // A candidate in both lists at rank r scores strictly above one in a
        // single list at the same rank, for any interior alpha.
        let ranker = FusionRanker::new(0.6).unwrap();
        let semantic = candidates(&[("both", 0.9), ("only_semantic", 0.8)]);
        let lexical = candidates(&[("both", 1.0)]);

        let results = ranker.fuse(&semantic, &lexical);
        let both = results.iter().find(|r| r.doc_id == "both").unwrap();

        let solo = ranker.fuse(&candidates(&[("solo", 0.9)]), &[]);
        assert!(both.score > solo[0].score);
        assert_eq!(results[0].doc_id, "both");
    }

    #[test]
    fn test_japan_visa_scenario() {
        // Semantic: [japan:1, uae:2, usa:3]; lexical: [japan:1].
        // Japan must come first with the highest fused score.
        let ranker = FusionRanker::new(0.7).unwrap();
        let semantic = candidates(&[("japan-visa", 0.91), ("uae-culture", 0.55), ("usa-law", 0.40)]);
        let lexical = candidates(&[("japan-visa", 1.0)]);

        let results = ranker.fuse(&semantic, &lexical);
        assert_eq!(results[0].doc_id, "japan-visa");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].semantic_rank, Some(1));
        assert_eq!(results[0].lexical_rank, Some(1));
        assert!((results[0].score - ranker.max_score()).abs() < 1e-6);
    }

    #[test]
    fn test_contributing_ranks_recorded() {
        let ranker = FusionRanker::new(0.5).unwrap();
        let semantic = candidates(&[("a", 0.9), ("b", 0.8)]);
        let lexical = candidates(&[("b", 1.0)]);

        let results = ranker.fuse(&semantic, &lexical);
        let b = results.iter().find(|r| r.doc_id == "b").unwrap();
        assert_eq!(b.semantic_rank, Some(2));
        assert_eq!(b.lexical_rank, Some(1));

        let a = results.iter().find(|r| r.doc_id == "a").unwrap();
        assert_eq!(a.semantic_rank, Some(1));
        assert_eq!(a.lexical_rank, None);
    }

    #[test]
    fn test_equal_score_ties_resolved_by_id() {
        // With alpha 0.5, two docs each at rank 1 of exactly one list score
        // identically; the id decides.
        let ranker = FusionRanker::new(0.5).unwrap();
        let semantic = candidates(&[("zulu", 0.9)]);
        let lexical = candidates(&[("alpha", 1.0)]);

        let results = ranker.fuse(&semantic, &lexical);
        assert_eq!(results[0].doc_id, "alpha");
        assert_eq!(results[1].doc_id, "zulu");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_alpha_one_ignores_lexical_weight() {
        let ranker = FusionRanker::new(1.0).unwrap();
        let semantic = candidates(&[("a", 0.9)]);
        let lexical = candidates(&[("b", 1.0)]);

        let results = ranker.fuse(&semantic, &lexical);
        let a = results.iter().find(|r| r.doc_id == "a").unwrap();
        let b = results.iter().find(|r| r.doc_id == "b").unwrap();
        assert!(a.score > 0.0);
        assert_eq!(b.score, 0.0);
        assert_eq!(results[0].doc_id, "a");
    }
}
