//! Fastest proxy selection strategy

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::{top_third, ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Selects uniformly among the fastest third of candidates
///
/// Candidates are ordered by average response time ascending; candidates
/// without metrics count as 0.0 and are therefore favored. Ties keep their
/// candidate order through the stable sort.
pub struct FastestSelector {
    rng: Mutex<StdRng>,
}

impl FastestSelector {
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
}

impl Default for FastestSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for FastestSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        _target_url: Option<&str>,
        ctx: &SelectionContext,
    ) -> Option<Proxy> {
        if candidates.is_empty() {
            return None;
        }

        let mut ordered: Vec<(Proxy, f64)> = candidates
            .iter()
            .map(|p| (p.clone(), ctx.avg_response_time(p)))
            .collect();
        ordered.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ordered.truncate(top_third(candidates.len()));

        let idx = self.rng.lock().gen_range(0..ordered.len());
        Some(ordered[idx].0.clone())
    }

    fn strategy_name(&self) -> &'static str {
        "fastest"
    }
}
