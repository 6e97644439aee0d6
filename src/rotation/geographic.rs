//! Geographic proxy selection strategy

use async_trait::async_trait;
use url::Url;

use super::{FailureAwareSelector, ProxySelector, SelectionContext};
use crate::models::Proxy;

/// Prefers proxies located in the target's country
///
/// Resolves the target URL's host through the geo collaborator and restricts
/// the candidate set to proxies whose country matches; the failure-aware
/// draw then runs on that subset, or on the full set when no candidate (or
/// no target location) matches. Geo lookup is best-effort.
pub struct GeographicSelector {
    inner: FailureAwareSelector,
}

impl GeographicSelector {
    pub fn new() -> Self {
        Self {
            inner: FailureAwareSelector::new(),
        }
    }

    /// Deterministic variant for tests
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: FailureAwareSelector::with_seed(seed),
        }
    }

    async fn target_country(&self, target_url: &str, ctx: &SelectionContext) -> Option<String> {
        let host = Url::parse(target_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))?;
        ctx.geo.locate(&host).await.map(|loc| loc.country)
    }
}

impl Default for GeographicSelector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProxySelector for GeographicSelector {
    async fn select(
        &self,
        candidates: &[Proxy],
        target_url: Option<&str>,
        ctx: &SelectionContext,
    ) -> Option<Proxy> {
        if candidates.is_empty() {
            return None;
        }

        if let Some(target) = target_url {
            if let Some(country) = self.target_country(target, ctx).await {
                let local: Vec<Proxy> = candidates
                    .iter()
                    .filter(|p| {
                        p.geo
                            .as_ref()
                            .map(|g| g.country == country)
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();

                if !local.is_empty() {
                    return self.inner.select(&local, None, ctx).await;
                }
            }
        }

        self.inner.select(candidates, None, ctx).await
    }

    fn strategy_name(&self) -> &'static str {
        "geographic"
    }
}
