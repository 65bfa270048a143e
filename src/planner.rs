//! Query planning: scan the scalar range, or over-fetch neighbours and
//! filter.
//!
//! Two plans exist for a filtered query:
//!
//! - **Range scan**: enumerate every id in `[smin, smax]` through the tree
//!   and rank by exact distance. Exact, and cheap when the filter is
//!   selective.
//! - **ANN-then-filter**: pull `O` approximate neighbours from the backend
//!   and drop the ones outside the range. Cheap when the filter passes a
//!   large share of the data, but returns short results if `O` is sized
//!   badly — which is what [`crate::sizing`] exists to prevent.
//!
//! With a caller-fixed `O` the choice is gated on `S < O` (fewer matches
//! than candidates requested means scanning them all is strictly better).
//! With a confidence target the planner always takes the ANN path and
//! sizes `O` probabilistically.

use crate::sizing::{self, SizingConfig};

/// Execution plan for one filtered query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryPlan {
    /// Enumerate the scalar range through the tree; exact distances.
    RangeScan,
    /// Fetch `candidates` approximate neighbours, then filter by scalar.
    AnnFilter { candidates: usize },
}

/// Plan for a caller-supplied candidate budget: scan when the whole filter
/// range is smaller than the budget, otherwise spend the budget.
#[must_use]
pub fn plan_fixed(passing: usize, candidates: usize) -> QueryPlan {
    if passing < candidates {
        QueryPlan::RangeScan
    } else {
        QueryPlan::AnnFilter { candidates }
    }
}

/// Plan for a confidence target: always ANN-then-filter, with the
/// candidate count solved so that fewer than `k` survivors has probability
/// at most `alpha` under the independence model.
#[must_use]
pub fn plan_probabilistic(
    total: usize,
    passing: usize,
    k: usize,
    alpha: f64,
    config: &SizingConfig,
) -> QueryPlan {
    QueryPlan::AnnFilter {
        candidates: sizing::choose_candidates(total, passing, k, alpha, config),
    }
}

/// Rank scored candidates: deduplicate by id, sort by ascending distance
/// with ties broken by ascending id, keep the best `k`.
#[must_use]
pub fn rank_candidates(mut scored: Vec<(f32, u32)>, k: usize) -> Vec<u32> {
    let mut seen = std::collections::HashSet::with_capacity(scored.len());
    scored.retain(|&(_, id)| seen.insert(id));
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.truncate(k);
    scored.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_plan_gates_on_passing_count() {
        assert_eq!(plan_fixed(5, 1000), QueryPlan::RangeScan);
        assert_eq!(
            plan_fixed(5000, 1000),
            QueryPlan::AnnFilter { candidates: 1000 }
        );
        // Equality spends the budget: S == O means the scan is no cheaper.
        assert_eq!(
            plan_fixed(1000, 1000),
            QueryPlan::AnnFilter { candidates: 1000 }
        );
    }

    #[test]
    fn probabilistic_plan_always_goes_ann() {
        let config = SizingConfig::default();
        let plan = plan_probabilistic(10_000, 3, 10, 0.01, &config);
        assert!(matches!(plan, QueryPlan::AnnFilter { .. }));
    }

    #[test]
    fn ranking_breaks_distance_ties_by_id() {
        let scored = vec![(1.0, 9), (1.0, 2), (0.5, 7), (2.0, 1)];
        assert_eq!(rank_candidates(scored, 3), vec![7, 2, 9]);
    }

    #[test]
    fn ranking_deduplicates_ids() {
        let scored = vec![(0.5, 3), (0.5, 3), (0.7, 1)];
        assert_eq!(rank_candidates(scored, 10), vec![3, 1]);
    }

    #[test]
    fn ranking_truncates_to_k() {
        let scored = vec![(0.1, 0), (0.2, 1), (0.3, 2)];
        assert_eq!(rank_candidates(scored, 2), vec![0, 1]);
        assert_eq!(rank_candidates(vec![], 5), Vec::<u32>::new());
    }
}
