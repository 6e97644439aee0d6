//! Failure-aware proxy selection strategy

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{top_third, ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Weighted random selection biased toward the healthiest candidates
///
/// Scores every candidate by health score (candidates without metrics score
/// 1.0), keeps the top third, and draws from that cut with score-proportional
/// probability. Ordering among equal scores follows candidate position after
/// a stable sort, so ties are cut non-deterministically with respect to any
/// secondary key.
pub struct FailureAwareSelector {
    rng: Mutex<StdRng>,
}

impl FailureAwareSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Weighted draw over `scored` using a cumulative-weight array
    ///
    /// Zero-weight entries occupy an empty segment and can only be drawn
    /// when every weight is zero, in which case the draw degenerates to a
    /// uniform pick.
    fn weighted_pick(&self, scored: &[(Proxy, f64)]) -> Option<Proxy> {
        if scored.is_empty() {
            return None;
        }

        let mut cumulative = Vec::with_capacity(scored.len());
        let mut total = 0.0;
        for (_, weight) in scored {
            total += weight;
            cumulative.push(total);
        }

        let mut rng = self.rng.lock();
        if total <= 0.0 {
            let idx = rng.gen_range(0..scored.len());
            return Some(scored[idx].0.clone());
        }

        let point = rng.gen_range(0.0..total);
        let idx = cumulative
            .iter()
            .position(|&c| c > point)
            .unwrap_or(scored.len() - 1);
        Some(scored[idx].0.clone())
    }
}

impl Default for FailureAwareSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for FailureAwareSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        _target_url: Option<&str>,
        ctx: &SelectionContext,
    ) -> Option<Proxy> {
        if candidates.is_empty() {
            return None;
        }

        let mut scored: Vec<(Proxy, f64)> = candidates
            .iter()
            .map(|p| (p.clone(), ctx.health_score(p)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_third(candidates.len()));

        self.weighted_pick(&scored)
    }

    fn strategy_name(&self) -> &'static str {
        "failure_aware"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{context_with_metrics, test_context, test_proxy};
    use super::*;
    use crate::models::ProxyMetrics;
    use std::collections::HashSet;

    fn metrics_with_failures(failures: u32) -> ProxyMetrics {
        let mut m = ProxyMetrics::new();
        for _ in 0..failures {
            m.record_failure();
        }
        m
    }

    #[tokio::test]
    async fn test_failure_aware_empty() {
        let selector = FailureAwareSelector::with_seed(7);
        let ctx = test_context();
        assert!(selector.select(&[], None, &ctx).await.is_none());
    }

    #[tokio::test]
    async fn test_failure_aware_single_candidate() {
        let selector = FailureAwareSelector::with_seed(7);
        let ctx = test_context();
        let only = test_proxy(8081);

        let picked = selector.select(&[only.clone()], None, &ctx).await.unwrap();
        assert_eq!(picked.id, only.id);
    }

    #[tokio::test]
    async fn test_failure_aware_draws_only_from_top_third() {
        let selector = FailureAwareSelector::with_seed(42);

        // Nine candidates: three pristine, six with growing failure streaks.
        let candidates: Vec<Proxy> = (0..9).map(|i| test_proxy(9000 + i)).collect();
        let metrics = candidates.iter().enumerate().skip(3).map(|(i, p)| {
            (p.id.clone(), metrics_with_failures(1 + i as u32))
        });
        let ctx = context_with_metrics(metrics);

        let top: HashSet<_> = candidates[..3].iter().map(|p| p.id.clone()).collect();
        for _ in 0..200 {
            let picked = selector.select(&candidates, None, &ctx).await.unwrap();
            assert!(top.contains(&picked.id), "picked outside top third");
        }
    }

    #[tokio::test]
    async fn test_failure_aware_never_picks_zero_score_over_positive() {
        let selector = FailureAwareSelector::with_seed(13);

        // One healthy candidate among eight with zeroed-out scores.
        let candidates: Vec<Proxy> = (0..9).map(|i| test_proxy(9100 + i)).collect();
        let metrics = candidates
            .iter()
            .skip(1)
            .map(|p| (p.id.clone(), metrics_with_failures(10)));
        let ctx = context_with_metrics(metrics);

        for _ in 0..200 {
            let picked = selector.select(&candidates, None, &ctx).await.unwrap();
            assert_eq!(picked.id, candidates[0].id);
        }
    }

    #[tokio::test]
    async fn test_failure_aware_all_zero_scores_still_selects() {
        let selector = FailureAwareSelector::with_seed(3);

        let candidates: Vec<Proxy> = (0..3).map(|i| test_proxy(9200 + i)).collect();
        let metrics = candidates
            .iter()
            .map(|p| (p.id.clone(), metrics_with_failures(10)));
        let ctx = context_with_metrics(metrics);

        assert!(selector.select(&candidates, None, &ctx).await.is_some());
    }

    #[tokio::test]
    async fn test_failure_aware_distribution_favors_higher_scores() {
        let selector = FailureAwareSelector::with_seed(99);

        // Four candidates so the cut keeps two: a pristine one (score 1.0)
        // and a mixed-history one (score well below 1.0 but positive). The
        // two fillers score 0 and stay outside the cut.
        let strong = test_proxy(9301);
        let weak = test_proxy(9302);
        let wide = vec![strong.clone(), weak.clone(), test_proxy(9303), test_proxy(9304)];

        let mut weak_history = ProxyMetrics::new();
        for _ in 0..6 {
            weak_history.record_success(0.2);
        }
        for _ in 0..4 {
            weak_history.record_failure();
        }
        assert!(weak_history.health_score() > 0.0);
        assert!(weak_history.health_score() < 1.0);

        let ctx = context_with_metrics([
            (weak.id.clone(), weak_history),
            (wide[2].id.clone(), metrics_with_failures(8)),
            (wide[3].id.clone(), metrics_with_failures(8)),
        ]);

        let mut strong_wins = 0usize;
        for _ in 0..500 {
            let picked = selector.select(&wide, None, &ctx).await.unwrap();
            if picked.id == strong.id {
                strong_wins += 1;
            }
        }

        // 1.0 vs a sub-0.5 score: expect a solid majority without asserting
        // an exact split.
        assert!(strong_wins > 300, "strong won only {} of 500", strong_wins);
    }
}
