//! Candidate proxy validation
//!
//! A one-time connectivity probe performed before a candidate proxy is
//! admitted to a pool.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ValidationConfig;

/// Connectivity check for candidate proxies
///
/// `validate` is a pure probe: it never mutates state, and a `false` result
/// just means the candidate is discarded.
#[async_trait]
pub trait ProxyValidator: Send + Sync {
    async fn validate(&self, proxy_url: &str) -> bool;
}

/// Validates candidates by fetching public what-is-my-ip endpoints through
/// them
///
/// Endpoints are tried in order; the first successful response wins. Every
/// attempt is bounded by the configured validation timeout.
pub struct HttpValidator {
    test_endpoints: Vec<String>,
    timeout: Duration,
}

impl HttpValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            test_endpoints: config.test_endpoints.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl ProxyValidator for HttpValidator {
    async fn validate(&self, proxy_url: &str) -> bool {
        let proxy = match reqwest::Proxy::all(proxy_url) {
            Ok(p) => p,
            Err(e) => {
                warn!("Rejecting candidate {}: {}", proxy_url, e);
                return false;
            }
        };

        let client = match reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                warn!("Rejecting candidate {}: {}", proxy_url, e);
                return false;
            }
        };

        for endpoint in &self.test_endpoints {
            match client.get(endpoint).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Candidate {} validated via {}", proxy_url, endpoint);
                    return true;
                }
                Ok(resp) => {
                    debug!(
                        "Candidate {} got {} from {}",
                        proxy_url,
                        resp.status(),
                        endpoint
                    );
                }
                Err(e) => {
                    debug!("Candidate {} failed against {}: {}", proxy_url, endpoint, e);
                }
            }
        }

        false
    }
}
