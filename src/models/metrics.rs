use std::collections::VecDeque;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HealthPolicy;

/// Number of recent response-time samples retained per proxy
pub const RESPONSE_TIME_WINDOW: usize = 100;

/// Per-proxy usage metrics
///
/// Created when a proxy is admitted to a pool and deleted together with it.
/// Success rate, average response time, and the health score are always
/// recomputed from the stored counters, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Last `RESPONSE_TIME_WINDOW` response times, in seconds
    response_times: VecDeque<f64>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            response_times: VecDeque::with_capacity(RESPONSE_TIME_WINDOW),
            last_success_at: None,
            last_failure_at: None,
            consecutive_failures: 0,
        }
    }

    /// Record a successful request and its response time in seconds
    pub fn record_success(&mut self, response_time: f64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.consecutive_failures = 0;
        self.last_success_at = Some(Utc::now());

        if self.response_times.len() == RESPONSE_TIME_WINDOW {
            self.response_times.pop_front();
        }
        self.response_times.push_back(response_time);
    }

    /// Record a failed request
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.consecutive_failures += 1;
        self.last_failure_at = Some(Utc::now());
    }

    /// Success rate over all recorded requests; 1.0 before any request
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            self.successful_requests as f64 / self.total_requests as f64
        }
    }

    /// Mean of the retained response-time window; 0.0 when empty
    pub fn avg_response_time(&self) -> f64 {
        if self.response_times.is_empty() {
            0.0
        } else {
            self.response_times.iter().sum::<f64>() / self.response_times.len() as f64
        }
    }

    /// Derived fitness score in [0, 1]
    ///
    /// Combines the success rate, a penalty for the current failure streak
    /// (capped at 0.5), a bonus for a success within the last hour, and a
    /// speed factor that discounts slow proxies down to half their score.
    pub fn health_score(&self) -> f64 {
        let failure_penalty = (self.consecutive_failures as f64 * 0.1).min(0.5);

        let recency_bonus = match self.last_success_at {
            Some(at) if Utc::now() - at < ChronoDuration::hours(1) => 0.1,
            _ => 0.0,
        };

        let avg = self.avg_response_time();
        let speed_factor = if avg > 0.0 {
            (1.0 - avg / 10.0).max(0.5)
        } else {
            1.0
        };

        ((self.success_rate() - failure_penalty + recency_bonus) * speed_factor).clamp(0.0, 1.0)
    }

    /// Health predicate: score above threshold and failure streak below cap
    pub fn is_healthy(&self, policy: &HealthPolicy) -> bool {
        self.health_score() >= policy.min_health_score
            && self.consecutive_failures < policy.max_consecutive_failures
    }

    /// Number of retained response-time samples
    pub fn sample_count(&self) -> usize {
        self.response_times.len()
    }
}

impl Default for ProxyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_metrics_are_healthy() {
        let metrics = ProxyMetrics::new();

        assert_eq!(metrics.success_rate(), 1.0);
        assert_eq!(metrics.avg_response_time(), 0.0);
        assert_eq!(metrics.health_score(), 1.0);
        assert!(metrics.is_healthy(&HealthPolicy::default()));
    }

    #[test]
    fn test_record_success_and_failure_counters() {
        let mut metrics = ProxyMetrics::new();

        metrics.record_success(0.5);
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.consecutive_failures, 0);
        assert!(metrics.last_success_at.is_some());

        metrics.record_failure();
        metrics.record_failure();
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 2);
        assert_eq!(metrics.consecutive_failures, 2);
        assert!(metrics.last_failure_at.is_some());

        metrics.record_success(1.0);
        assert_eq!(metrics.consecutive_failures, 0);
    }

    #[test]
    fn test_response_time_window_is_bounded() {
        let mut metrics = ProxyMetrics::new();

        for _ in 0..RESPONSE_TIME_WINDOW {
            metrics.record_success(2.0);
        }
        assert_eq!(metrics.sample_count(), RESPONSE_TIME_WINDOW);
        assert!((metrics.avg_response_time() - 2.0).abs() < 1e-9);

        // Newer samples displace the oldest
        for _ in 0..RESPONSE_TIME_WINDOW {
            metrics.record_success(4.0);
        }
        assert_eq!(metrics.sample_count(), RESPONSE_TIME_WINDOW);
        assert!((metrics.avg_response_time() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_health_score_stays_in_unit_interval() {
        let mut metrics = ProxyMetrics::new();

        // Alternate successes and failure bursts; the score must never
        // escape [0, 1].
        for round in 0..50 {
            if round % 3 == 0 {
                metrics.record_success(0.1 * round as f64);
            } else {
                metrics.record_failure();
            }
            let score = metrics.health_score();
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_consecutive_failures_penalize_score() {
        let mut metrics = ProxyMetrics::new();
        metrics.record_success(0.1);
        let before = metrics.health_score();

        metrics.record_failure();
        metrics.record_failure();
        let after = metrics.health_score();

        assert!(after < before);
    }

    #[test]
    fn test_failure_streak_breaks_health_predicate() {
        let policy = HealthPolicy::default();
        let mut metrics = ProxyMetrics::new();

        // Keep the score high with plenty of fast successes, then fail
        // exactly max_consecutive_failures times.
        for _ in 0..50 {
            metrics.record_success(0.1);
        }
        for _ in 0..policy.max_consecutive_failures {
            metrics.record_failure();
        }

        assert!(!metrics.is_healthy(&policy));
    }

    #[test]
    fn test_slow_proxy_speed_factor() {
        let mut fast = ProxyMetrics::new();
        let mut slow = ProxyMetrics::new();

        fast.record_success(0.2);
        slow.record_success(9.0);

        assert!(fast.health_score() > slow.health_score());
        // Speed factor bottoms out at 0.5
        let mut crawling = ProxyMetrics::new();
        crawling.record_success(60.0);
        assert!(crawling.health_score() >= 0.5);
    }
}
