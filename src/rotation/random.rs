//! Random proxy selection strategy

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Selects a uniformly random candidate
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
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

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for RandomSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        _target_url: Option<&str>,
        _ctx: &SelectionContext,
    ) -> Option<Proxy> {
        let mut rng = self.rng.lock();
        candidates.choose(&mut *rng).cloned()
    }

    fn strategy_name(&self) -> &'static str {
        "random"
    }
}
