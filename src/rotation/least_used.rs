//! Least-used proxy selection strategy

use async_trait::async_trait;

use super::{ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Selects the candidate whose `last_used_at` is oldest
///
/// Proxies that have never been used sort before any used proxy, so fresh
/// additions get traffic first.
pub struct LeastUsedSelector;

impl LeastUsedSelector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LeastUsedSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for LeastUsedSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        _target_url: Option<&str>,
        _ctx: &SelectionContext,
    ) -> Option<Proxy> {
        // None sorts before Some, so never-used candidates win
        candidates.iter().min_by_key(|p| p.last_used_at).cloned()
    }

    fn strategy_name(&self) -> &'static str {
        "least_used"
    }
}
