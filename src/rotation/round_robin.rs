//! Round-robin proxy selection strategy

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Selects proxies in round-robin order
///
/// Uses a single atomic cursor for lock-free index tracking. The cursor is
/// shared across all calls regardless of which candidate subset was passed,
/// so fair cycling is only guaranteed while the eligible set stays stable
/// between calls. This is a known limitation, kept deliberately.
pub struct RoundRobinSelector {
    cursor: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobinSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for RoundRobinSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        _target_url: Option<&str>,
        _ctx: &SelectionContext,
    ) -> Option<Proxy> {
        if candidates.is_empty() {
            return None;
        }

        // Atomically increment and get the previous value, then wrap around
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.get(idx).cloned()
    }

    fn strategy_name(&self) -> &'static str {
        "round_robin"
    }
}
