//! Background health monitoring for pooled proxies
//!
//! Periodically probes every proxy, feeds the outcomes into metrics, and
//! evicts proxies whose health score has dropped below the policy floor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::HealthConfig;
use crate::models::Proxy;
use crate::pool::ProxyPoolRegistry;

/// Single lightweight health probe through a proxy
///
/// Returns the response time in seconds on success, `None` on any failure.
/// Failures are metrics signal, never errors.
#[async_trait]
pub trait ProxyProber: Send + Sync {
    async fn probe(&self, proxy: &Proxy) -> Option<f64>;
}

/// Probes by fetching a fixed URL through the proxy with a bounded timeout
pub struct HttpProber {
    probe_url: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            probe_url: config.probe_url.clone(),
            timeout: config.probe_timeout,
        }
    }
}

#[async_trait]
impl ProxyProber for HttpProber {
    async fn probe(&self, proxy: &Proxy) -> Option<f64> {
        let upstream = reqwest::Proxy::all(&proxy.url).ok()?;
        let client = reqwest::Client::builder()
            .proxy(upstream)
            .timeout(self.timeout)
            .build()
            .ok()?;

        let started = Instant::now();
        match client.get(&self.probe_url).send().await {
            Ok(resp) if resp.status().is_success() => Some(started.elapsed().as_secs_f64()),
            Ok(resp) => {
                debug!("Probe of {} got status {}", proxy.url, resp.status());
                None
            }
            Err(e) => {
                debug!("Probe of {} failed: {}", proxy.url, e);
                None
            }
        }
    }
}

struct MonitorWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic health monitor over a pool registry
///
/// Lifecycle is `Stopped → Running → Stopped`; `start` on a running monitor
/// and `stop` on a stopped one are no-ops.
pub struct HealthMonitor {
    registry: Arc<ProxyPoolRegistry>,
    prober: Arc<dyn ProxyProber>,
    config: HealthConfig,
    worker: Mutex<Option<MonitorWorker>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<ProxyPoolRegistry>,
        prober: Arc<dyn ProxyProber>,
        config: HealthConfig,
    ) -> Self {
        Self {
            registry,
            prober,
            config,
            worker: Mutex::new(None),
        }
    }

    /// Spawn the periodic sweep worker
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = self.registry.clone();
        let prober = self.prober.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            info!(
                "Starting health monitor with {}s interval",
                config.check_interval.as_secs()
            );

            let mut ticker = interval(config.check_interval);
            ticker.tick().await; // First sweep happens one interval in

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep(&registry, prober.as_ref(), &config).await;
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Health monitor shutting down");
                            break;
                        }
                    }
                }
            }
        });

        *worker = Some(MonitorWorker {
            shutdown_tx,
            handle,
        });
    }

    /// Signal shutdown and wait for the worker, including any in-flight
    /// probe batch, to finish
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.shutdown_tx.send(true);
            let _ = worker.handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Run one sweep synchronously (also used by tests)
    pub async fn sweep_once(&self) {
        sweep(&self.registry, self.prober.as_ref(), &self.config).await;
    }
}

/// One full sweep: probe every proxy concurrently, record outcomes, then
/// evict on the settled post-sweep metrics
async fn sweep(registry: &ProxyPoolRegistry, prober: &dyn ProxyProber, config: &HealthConfig) {
    // Snapshot first; pools may be mutated by the request path while probes
    // are in flight.
    let proxies = registry.all_proxies();
    if proxies.is_empty() {
        debug!("Health sweep skipped: no proxies registered");
        return;
    }

    info!("Checking health of {} proxies", proxies.len());

    let results: Vec<bool> = futures::stream::iter(proxies.clone())
        .map(|proxy| async move {
            match prober.probe(&proxy).await {
                Some(response_time) => {
                    registry.record_result(&proxy.id, true, response_time);
                    true
                }
                None => {
                    registry.record_result(&proxy.id, false, 0.0);
                    false
                }
            }
        })
        .buffer_unordered(config.probe_concurrency)
        .collect()
        .await;

    let healthy_count = results.iter().filter(|&&ok| ok).count();
    let unhealthy_count = results.len() - healthy_count;

    // Evict only after the whole batch has settled, from the snapshot taken
    // above, so the pass never iterates a moving target.
    let mut evicted = 0usize;
    for proxy in &proxies {
        let Some(metrics) = registry.metrics_for(&proxy.id) else {
            continue;
        };
        if metrics.health_score() < config.policy.min_health_score {
            warn!(
                "Evicting proxy {} (score {:.2})",
                proxy.url,
                metrics.health_score()
            );
            registry.remove(&proxy.id);
            evicted += 1;
        }
    }

    info!(
        "Health sweep complete: {} healthy, {} unhealthy, {} evicted",
        healthy_count, unhealthy_count, evicted
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthPolicy;
    use crate::pool::registry::test_support::{configs, test_registry};

    /// Prober with fixed per-sweep behavior
    struct StubProber {
        response_time: Option<f64>,
    }

    #[async_trait]
    impl ProxyProber for StubProber {
        async fn probe(&self, _proxy: &Proxy) -> Option<f64> {
            self.response_time
        }
    }

    fn monitor_with(
        registry: Arc<ProxyPoolRegistry>,
        response_time: Option<f64>,
    ) -> HealthMonitor {
        HealthMonitor::new(
            registry,
            Arc::new(StubProber { response_time }),
            HealthConfig {
                check_interval: Duration::from_secs(3600),
                probe_timeout: Duration::from_secs(1),
                probe_url: "http://unused.example/ip".to_string(),
                probe_concurrency: 4,
                policy: HealthPolicy::default(),
            },
        )
    }

    #[tokio::test]
    async fn test_sweep_records_successes() {
        let registry = Arc::new(test_registry());
        registry
            .add_pool(&configs(&[8081, 8082]), "datacenter")
            .await
            .unwrap();

        let monitor = monitor_with(registry.clone(), Some(0.25));
        monitor.sweep_once().await;

        assert_eq!(registry.len(), 2);
        for proxy in registry.all_proxies() {
            let metrics = registry.metrics_for(&proxy.id).unwrap();
            assert_eq!(metrics.successful_requests, 1);
            assert_eq!(metrics.consecutive_failures, 0);
        }
    }

    #[tokio::test]
    async fn test_sweep_evicts_failing_proxies() {
        let registry = Arc::new(test_registry());
        registry
            .add_pool(&configs(&[8081]), "datacenter")
            .await
            .unwrap();

        // A failed probe on a fresh proxy drops the success rate to zero,
        // putting the score below the 0.3 floor immediately.
        let monitor = monitor_with(registry.clone(), None);
        monitor.sweep_once().await;

        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_evicts_after_failure_streak() {
        let registry = Arc::new(test_registry());
        registry
            .add_pool(&configs(&[8081, 8082]), "datacenter")
            .await
            .unwrap();
        let ids: Vec<_> = registry.all_proxies().iter().map(|p| p.id.clone()).collect();

        // Long healthy history for the first proxy, a failure streak for
        // the second. The sweep itself fails for both; the history keeps the
        // first proxy's score afloat while the second sinks below the floor.
        for _ in 0..20 {
            registry.record_result(&ids[0], true, 0.1);
        }
        for _ in 0..HealthPolicy::default().max_consecutive_failures {
            registry.record_result(&ids[1], false, 0.0);
        }

        let monitor = monitor_with(registry.clone(), None);
        monitor.sweep_once().await;

        assert!(registry.metrics_for(&ids[0]).is_some());
        assert!(registry.metrics_for(&ids[1]).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_empty_registry_is_noop() {
        let registry = Arc::new(test_registry());
        let monitor = monitor_with(registry.clone(), None);
        monitor.sweep_once().await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let registry = Arc::new(test_registry());
        let monitor = monitor_with(registry, Some(0.1));

        assert!(!monitor.is_running());
        monitor.start();
        assert!(monitor.is_running());
        // Idempotent start
        monitor.start();
        assert!(monitor.is_running());

        monitor.stop().await;
        assert!(!monitor.is_running());
        // Idempotent stop
        monitor.stop().await;
        assert!(!monitor.is_running());
    }
}
