//! Rotation manager facade
//!
//! Single owner of the pool registry, the strategy set, and the health
//! monitor. This is the only surface the surrounding request layer talks to.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::models::{PoolType, Proxy, ProxyMetrics};
use crate::monitor::{HealthMonitor, HttpProber, ProxyProber};
use crate::pool::{
    GeoLocationProvider, HttpGeoProvider, HttpValidator, ProxyPoolRegistry, ProxyRequirements,
    ProxyValidator,
};
use crate::rotation::{create_selector, ProxySelector, RotationStrategy, SelectionContext};

/// Aggregated counters for one pool
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatistics {
    pub pool_type: PoolType,
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

/// Aggregated counters across all pools
///
/// Computed from current metrics on every call; there is no separate ledger.
#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub pools: Vec<PoolStatistics>,
    pub total_proxies: usize,
    pub healthy_proxies: usize,
    pub unhealthy_proxies: usize,
    pub success_rate: f64,
    pub avg_response_time: f64,
}

/// Full view of one proxy and its derived metrics
#[derive(Debug, Clone, Serialize)]
pub struct ProxyDetails {
    pub proxy: Proxy,
    pub metrics: ProxyMetrics,
    pub success_rate: f64,
    pub avg_response_time: f64,
    pub health_score: f64,
    pub healthy: bool,
}

/// Facade over pools, strategies, and health monitoring
pub struct ProxyRotationManager {
    registry: Arc<ProxyPoolRegistry>,
    monitor: HealthMonitor,
    selectors: HashMap<RotationStrategy, Box<dyn ProxySelector>>,
    geo: Arc<dyn GeoLocationProvider>,
}

impl ProxyRotationManager {
    /// Build a manager wired to the real HTTP collaborators
    pub fn new(config: &Config) -> Self {
        Self::with_components(
            config,
            Arc::new(HttpValidator::new(&config.validation)),
            Arc::new(HttpGeoProvider::new(&config.geo)),
            Arc::new(HttpProber::new(&config.health)),
        )
    }

    /// Build a manager with injected collaborators
    pub fn with_components(
        config: &Config,
        validator: Arc<dyn ProxyValidator>,
        geo: Arc<dyn GeoLocationProvider>,
        prober: Arc<dyn ProxyProber>,
    ) -> Self {
        let registry = Arc::new(ProxyPoolRegistry::new(
            validator,
            geo.clone(),
            config.health.policy,
        ));
        let monitor = HealthMonitor::new(registry.clone(), prober, config.health.clone());

        // One live selector per strategy; the round-robin cursor in
        // particular must persist across calls.
        let selectors = RotationStrategy::ALL
            .into_iter()
            .map(|s| (s, create_selector(s)))
            .collect();

        Self {
            registry,
            monitor,
            selectors,
            geo,
        }
    }

    /// Start background health monitoring
    pub fn initialize(&self) {
        self.monitor.start();
        info!("Proxy rotation manager initialized");
    }

    /// Stop background monitoring, waiting for in-flight probes
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        info!("Proxy rotation manager shut down");
    }

    /// Validate and admit candidates into a named pool
    pub async fn add_pool(&self, configs: &[String], pool_type: &str) -> Result<usize> {
        self.registry.add_pool(configs, pool_type).await
    }

    /// Remove one proxy and its metrics
    pub fn remove(&self, proxy_id: &str) -> bool {
        self.registry.remove(proxy_id)
    }

    /// Drop every proxy in one pool
    pub fn clear_pool(&self, pool_type: PoolType) -> usize {
        self.registry.clear_pool(pool_type)
    }

    /// Pick the best proxy for a request under the named strategy
    ///
    /// Unrecognized strategy names fall back to the failure-aware default.
    /// Returns `None` when no proxy passes the health and requirement
    /// filters; callers decide their own fallback (e.g. direct connection).
    pub async fn get_optimal_proxy(
        &self,
        target_url: Option<&str>,
        strategy_name: &str,
        requirements: &ProxyRequirements,
    ) -> Option<Proxy> {
        let candidates = self.registry.filter(requirements);
        if candidates.is_empty() {
            debug!("No eligible proxy for strategy {}", strategy_name);
            return None;
        }

        let strategy = RotationStrategy::from_str(strategy_name);
        let selector = self
            .selectors
            .get(&strategy)
            .unwrap_or_else(|| &self.selectors[&RotationStrategy::FailureAware]);

        let ids: Vec<_> = candidates.iter().map(|p| p.id.clone()).collect();
        let ctx = SelectionContext {
            metrics: self.registry.metrics_snapshot(&ids),
            geo: self.geo.clone(),
        };

        let selected = selector.select(&candidates, target_url, &ctx).await;
        if let Some(proxy) = &selected {
            self.registry.touch(&proxy.id);
        }
        selected
    }

    /// Report a request outcome for a proxy
    ///
    /// Safe no-op when the proxy was evicted while the request was in
    /// flight. Eviction itself only ever happens inside a monitor sweep.
    pub fn record_result(&self, proxy_id: &str, success: bool, response_time: f64) {
        self.registry.record_result(proxy_id, success, response_time);
    }

    /// Current per-pool and global statistics
    pub fn statistics(&self) -> Statistics {
        let policy = self.registry.policy();

        let mut pools = Vec::with_capacity(PoolType::ALL.len());
        let mut total_requests = 0u64;
        let mut successful_requests = 0u64;
        let mut rt_sum = 0.0f64;
        let mut rt_count = 0usize;
        let mut healthy_proxies = 0usize;
        let mut total_proxies = 0usize;

        for pool_type in PoolType::ALL {
            let proxies = self.registry.pool_proxies(pool_type);
            let mut pool_requests = 0u64;
            let mut pool_successes = 0u64;
            let mut pool_rt_sum = 0.0f64;
            let mut pool_rt_count = 0usize;
            let mut pool_healthy = 0usize;

            for proxy in &proxies {
                let Some(metrics) = self.registry.metrics_for(&proxy.id) else {
                    continue;
                };
                pool_requests += metrics.total_requests;
                pool_successes += metrics.successful_requests;
                if metrics.sample_count() > 0 {
                    pool_rt_sum += metrics.avg_response_time();
                    pool_rt_count += 1;
                }
                if metrics.is_healthy(&policy) {
                    pool_healthy += 1;
                }
            }

            total_requests += pool_requests;
            successful_requests += pool_successes;
            rt_sum += pool_rt_sum;
            rt_count += pool_rt_count;
            healthy_proxies += pool_healthy;
            total_proxies += proxies.len();

            pools.push(PoolStatistics {
                pool_type,
                total: proxies.len(),
                healthy: pool_healthy,
                unhealthy: proxies.len() - pool_healthy,
                success_rate: ratio(pool_successes, pool_requests),
                avg_response_time: mean(pool_rt_sum, pool_rt_count),
            });
        }

        Statistics {
            pools,
            total_proxies,
            healthy_proxies,
            unhealthy_proxies: total_proxies - healthy_proxies,
            success_rate: ratio(successful_requests, total_requests),
            avg_response_time: mean(rt_sum, rt_count),
        }
    }

    /// Full details for one proxy, if it is still registered
    pub fn proxy_details(&self, proxy_id: &str) -> Option<ProxyDetails> {
        let proxy = self
            .registry
            .all_proxies()
            .into_iter()
            .find(|p| p.id == proxy_id)?;
        let metrics = self.registry.metrics_for(proxy_id)?;
        let policy = self.registry.policy();

        Some(ProxyDetails {
            success_rate: metrics.success_rate(),
            avg_response_time: metrics.avg_response_time(),
            health_score: metrics.health_score(),
            healthy: metrics.is_healthy(&policy),
            proxy,
            metrics,
        })
    }

    /// Top proxies by health score, optionally restricted to one pool
    pub fn best_proxies(&self, count: usize, pool_type: Option<PoolType>) -> Vec<Proxy> {
        let proxies = match pool_type {
            Some(t) => self.registry.pool_proxies(t),
            None => self.registry.all_proxies(),
        };

        let mut scored: Vec<(Proxy, f64)> = proxies
            .into_iter()
            .map(|p| {
                let score = self
                    .registry
                    .metrics_for(&p.id)
                    .map(|m| m.health_score())
                    .unwrap_or(0.0);
                (p, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(count);
        scored.into_iter().map(|(p, _)| p).collect()
    }

    /// Total number of registered proxies
    pub fn proxy_count(&self) -> usize {
        self.registry.len()
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
