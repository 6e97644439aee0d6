//! Proxy rotation strategies
//!
//! This module provides various strategies for selecting a proxy from a
//! filtered candidate set.

mod failure_aware;
mod fastest;
mod geographic;
mod least_used;
mod random;
mod round_robin;

pub use failure_aware::FailureAwareSelector;
pub use fastest::FastestSelector;
pub use geographic::GeographicSelector;
pub use least_used::LeastUsedSelector;
pub use random::RandomSelector;
pub use round_robin::RoundRobinSelector;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{Proxy, ProxyId, ProxyMetrics};
use crate::pool::GeoLocationProvider;

/// Strategy types for proxy rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RotationStrategy {
    RoundRobin,
    LeastUsed,
    #[default]
    FailureAware,
    Geographic,
    Random,
    Fastest,
}

impl RotationStrategy {
    pub const ALL: [RotationStrategy; 6] = [
        RotationStrategy::RoundRobin,
        RotationStrategy::LeastUsed,
        RotationStrategy::FailureAware,
        RotationStrategy::Geographic,
        RotationStrategy::Random,
        RotationStrategy::Fastest,
    ];

    /// Parse a strategy name; unrecognized names fall back to FailureAware
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "round_robin" | "roundrobin" | "round-robin" => Self::RoundRobin,
            "least_used" | "leastused" | "least-used" => Self::LeastUsed,
            "failure_aware" | "failureaware" | "failure-aware" => Self::FailureAware,
            "geographic" | "geo" => Self::Geographic,
            "random" => Self::Random,
            "fastest" => Self::Fastest,
            _ => Self::FailureAware,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::LeastUsed => "least_used",
            Self::FailureAware => "failure_aware",
            Self::Geographic => "geographic",
            Self::Random => "random",
            Self::Fastest => "fastest",
        }
    }
}

/// Read-only state handed to a selector for one selection
///
/// Holds a metrics snapshot taken when the candidates were filtered, so
/// selection never races pool mutation, plus the geo collaborator used by
/// the geographic strategy.
pub struct SelectionContext {
    pub metrics: HashMap<ProxyId, ProxyMetrics>,
    pub geo: Arc<dyn GeoLocationProvider>,
}

impl SelectionContext {
    /// Health score for a candidate; unknown metrics default to 1.0
    pub fn health_score(&self, proxy: &Proxy) -> f64 {
        self.metrics
            .get(&proxy.id)
            .map(|m| m.health_score())
            .unwrap_or(1.0)
    }

    /// Average response time for a candidate; unknown metrics default to 0.0
    pub fn avg_response_time(&self, proxy: &Proxy) -> f64 {
        self.metrics
            .get(&proxy.id)
            .map(|m| m.avg_response_time())
            .unwrap_or(0.0)
    }
}

/// Trait for proxy selection strategies
///
/// Implementations pick one proxy from the candidate set, or `None` when the
/// set is empty. Candidates have already passed health and requirement
/// filtering.
#[async_trait]
pub trait ProxySelector: Send + Sync {
    async fn select(
        &self,
        candidates: &[Proxy],
        target_url: Option<&str>,
        ctx: &SelectionContext,
    ) -> Option<Proxy>;

    /// Get the strategy name
    fn strategy_name(&self) -> &'static str;
}

/// Size of a "top third" cut: ⌈n/3⌉, never below 1
pub(crate) fn top_third(n: usize) -> usize {
    n.div_ceil(3).max(1)
}

/// Create a proxy selector based on the strategy type
pub fn create_selector(strategy: RotationStrategy) -> Box<dyn ProxySelector> {
    match strategy {
        RotationStrategy::RoundRobin => Box::new(RoundRobinSelector::new()),
        RotationStrategy::LeastUsed => Box::new(LeastUsedSelector::new()),
        RotationStrategy::FailureAware => Box::new(FailureAwareSelector::new()),
        RotationStrategy::Geographic => Box::new(GeographicSelector::new()),
        RotationStrategy::Random => Box::new(RandomSelector::new()),
        RotationStrategy::Fastest => Box::new(FastestSelector::new()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{GeoLocation, PoolType};

    /// Geo provider backed by a fixed host table
    pub struct TableGeoProvider {
        entries: HashMap<String, GeoLocation>,
    }

    impl TableGeoProvider {
        pub fn new(entries: impl IntoIterator<Item = (String, GeoLocation)>) -> Self {
            Self {
                entries: entries.into_iter().collect(),
            }
        }

        pub fn empty() -> Self {
            Self {
                entries: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl GeoLocationProvider for TableGeoProvider {
        async fn locate(&self, host: &str) -> Option<GeoLocation> {
            self.entries.get(host).cloned()
        }
    }

    pub fn test_proxy(port: u16) -> Proxy {
        Proxy::new(
            &format!("http://127.0.0.1:{}", port),
            PoolType::Datacenter,
            None,
        )
        .unwrap()
    }

    pub fn test_context() -> SelectionContext {
        SelectionContext {
            metrics: HashMap::new(),
            geo: Arc::new(TableGeoProvider::empty()),
        }
    }

    pub fn context_with_metrics(
        metrics: impl IntoIterator<Item = (ProxyId, ProxyMetrics)>,
    ) -> SelectionContext {
        SelectionContext {
            metrics: metrics.into_iter().collect(),
            geo: Arc::new(TableGeoProvider::empty()),
        }
    }
}
