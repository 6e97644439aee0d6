//! Pool registry
//!
//! Owns the four named pools and the per-proxy metrics map. A proxy and its
//! metrics live and die together: admission creates both under one lock
//! acquisition, removal deletes both, so no orphaned metrics can exist.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::HealthPolicy;
use crate::error::Result;
use crate::models::{PoolType, Proxy, ProxyId, ProxyMetrics};

use super::{GeoLocationProvider, ProxyValidator};

/// Requirement predicates applied by [`ProxyPoolRegistry::filter`]
///
/// All fields are optional; the health predicate always applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyRequirements {
    /// Restrict to these pool types
    pub pool_types: Option<Vec<PoolType>>,
    /// Restrict to proxies located in these countries
    pub countries: Option<Vec<String>>,
    /// Minimum success rate over recorded requests
    pub min_success_rate: Option<f64>,
    /// Maximum average response time in seconds
    pub max_response_time: Option<f64>,
}

struct RegistryInner {
    pools: HashMap<PoolType, Vec<Proxy>>,
    metrics: HashMap<ProxyId, ProxyMetrics>,
}

/// Registry of named proxy pools plus the global metrics map
pub struct ProxyPoolRegistry {
    inner: RwLock<RegistryInner>,
    validator: Arc<dyn ProxyValidator>,
    geo: Arc<dyn GeoLocationProvider>,
    policy: HealthPolicy,
}

impl ProxyPoolRegistry {
    pub fn new(
        validator: Arc<dyn ProxyValidator>,
        geo: Arc<dyn GeoLocationProvider>,
        policy: HealthPolicy,
    ) -> Self {
        let pools = PoolType::ALL
            .into_iter()
            .map(|t| (t, Vec::new()))
            .collect();

        Self {
            inner: RwLock::new(RegistryInner {
                pools,
                metrics: HashMap::new(),
            }),
            validator,
            geo,
            policy,
        }
    }

    /// Validate and admit a batch of candidate proxies into one pool
    ///
    /// Unknown pool types are a hard error; individual candidates that fail
    /// validation or parsing are dropped with a warning and the call
    /// succeeds partially. Returns the number of proxies admitted.
    pub async fn add_pool(&self, configs: &[String], pool_type: &str) -> Result<usize> {
        let pool_type = PoolType::parse(pool_type)?;

        let mut admitted = 0usize;
        for config in configs {
            if !self.validator.validate(config).await {
                warn!("Dropping candidate {}: validation failed", config);
                continue;
            }

            // Geo tagging is best-effort; candidates without a resolvable
            // location are admitted untagged.
            let host = url::Url::parse(config)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.to_string()));
            let geo = match host {
                Some(h) => self.geo.locate(&h).await,
                None => None,
            };

            let proxy = match Proxy::new(config, pool_type, geo) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Dropping candidate {}: {}", config, e);
                    continue;
                }
            };

            let mut inner = self.inner.write();
            if inner.metrics.contains_key(&proxy.id) {
                debug!("Candidate {} already registered, skipping", config);
                continue;
            }
            inner.metrics.insert(proxy.id.clone(), ProxyMetrics::new());
            inner.pools.entry(pool_type).or_default().push(proxy);
            admitted += 1;
        }

        info!(
            "Admitted {}/{} candidates into {} pool",
            admitted,
            configs.len(),
            pool_type
        );
        Ok(admitted)
    }

    /// Remove a proxy and its metrics; returns false if the id is unknown
    pub fn remove(&self, proxy_id: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.metrics.remove(proxy_id).is_none() {
            return false;
        }
        for pool in inner.pools.values_mut() {
            pool.retain(|p| p.id != proxy_id);
        }
        true
    }

    /// Remove every proxy in one pool; returns the number removed
    pub fn clear_pool(&self, pool_type: PoolType) -> usize {
        let mut inner = self.inner.write();
        let drained = inner
            .pools
            .get_mut(&pool_type)
            .map(std::mem::take)
            .unwrap_or_default();
        for proxy in &drained {
            inner.metrics.remove(&proxy.id);
        }
        drained.len()
    }

    /// Remove every proxy in every pool; returns the number removed
    pub fn clear_all(&self) -> usize {
        PoolType::ALL
            .into_iter()
            .map(|t| self.clear_pool(t))
            .sum()
    }

    /// Proxies passing the health predicate and every given requirement
    pub fn filter(&self, requirements: &ProxyRequirements) -> Vec<Proxy> {
        let inner = self.inner.read();

        let mut matches = Vec::new();
        for pool_type in PoolType::ALL {
            if let Some(allowed) = &requirements.pool_types {
                if !allowed.contains(&pool_type) {
                    continue;
                }
            }
            let Some(pool) = inner.pools.get(&pool_type) else {
                continue;
            };

            for proxy in pool {
                let Some(metrics) = inner.metrics.get(&proxy.id) else {
                    continue;
                };
                if !metrics.is_healthy(&self.policy) {
                    continue;
                }
                if let Some(countries) = &requirements.countries {
                    let in_allowed = proxy
                        .geo
                        .as_ref()
                        .map(|g| countries.contains(&g.country))
                        .unwrap_or(false);
                    if !in_allowed {
                        continue;
                    }
                }
                if let Some(min_rate) = requirements.min_success_rate {
                    if metrics.success_rate() < min_rate {
                        continue;
                    }
                }
                if let Some(max_rt) = requirements.max_response_time {
                    if metrics.avg_response_time() > max_rt {
                        continue;
                    }
                }
                matches.push(proxy.clone());
            }
        }

        matches
    }

    /// Snapshot of every proxy across all pools
    pub fn all_proxies(&self) -> Vec<Proxy> {
        let inner = self.inner.read();
        PoolType::ALL
            .into_iter()
            .filter_map(|t| inner.pools.get(&t))
            .flatten()
            .cloned()
            .collect()
    }

    /// Snapshot of one pool
    pub fn pool_proxies(&self, pool_type: PoolType) -> Vec<Proxy> {
        let inner = self.inner.read();
        inner
            .pools
            .get(&pool_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of a proxy's metrics
    pub fn metrics_for(&self, proxy_id: &str) -> Option<ProxyMetrics> {
        self.inner.read().metrics.get(proxy_id).cloned()
    }

    /// Metrics snapshots for a set of proxies
    pub fn metrics_snapshot(&self, ids: &[ProxyId]) -> HashMap<ProxyId, ProxyMetrics> {
        let inner = self.inner.read();
        ids.iter()
            .filter_map(|id| inner.metrics.get(id).map(|m| (id.clone(), m.clone())))
            .collect()
    }

    /// Record a request outcome against a proxy's metrics
    ///
    /// A no-op when the proxy has already been evicted; a result arriving
    /// mid-flight after eviction must never error.
    pub fn record_result(&self, proxy_id: &str, success: bool, response_time: f64) {
        let mut inner = self.inner.write();
        match inner.metrics.get_mut(proxy_id) {
            Some(metrics) => {
                if success {
                    metrics.record_success(response_time);
                } else {
                    metrics.record_failure();
                }
            }
            None => {
                debug!("Result for unknown proxy {} ignored", proxy_id);
            }
        }
    }

    /// Stamp a proxy's `last_used_at`
    pub fn touch(&self, proxy_id: &str) {
        let mut inner = self.inner.write();
        for pool in inner.pools.values_mut() {
            if let Some(proxy) = pool.iter_mut().find(|p| p.id == proxy_id) {
                proxy.last_used_at = Some(Utc::now());
                return;
            }
        }
    }

    /// Health predicate thresholds this registry applies
    pub fn policy(&self) -> HealthPolicy {
        self.policy
    }

    /// Total number of registered proxies
    pub fn len(&self) -> usize {
        self.inner.read().metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::GeoLocation;
    use async_trait::async_trait;

    /// Validator with a fixed verdict
    pub struct StubValidator {
        pub accept: bool,
    }

    #[async_trait]
    impl ProxyValidator for StubValidator {
        async fn validate(&self, _proxy_url: &str) -> bool {
            self.accept
        }
    }

    /// Geo provider backed by a fixed host table
    pub struct StubGeoProvider {
        pub entries: HashMap<String, GeoLocation>,
    }

    impl StubGeoProvider {
        pub fn empty() -> Self {
            Self {
                entries: HashMap::new(),
            }
        }

        pub fn with(entries: impl IntoIterator<Item = (String, GeoLocation)>) -> Self {
            Self {
                entries: entries.into_iter().collect(),
            }
        }
    }

    #[async_trait]
    impl GeoLocationProvider for StubGeoProvider {
        async fn locate(&self, host: &str) -> Option<GeoLocation> {
            self.entries.get(host).cloned()
        }
    }

    pub fn test_registry() -> ProxyPoolRegistry {
        ProxyPoolRegistry::new(
            Arc::new(StubValidator { accept: true }),
            Arc::new(StubGeoProvider::empty()),
            HealthPolicy::default(),
        )
    }

    pub fn configs(ports: &[u16]) -> Vec<String> {
        ports
            .iter()
            .map(|p| format!("http://127.0.0.1:{}", p))
            .collect()
    }
}
