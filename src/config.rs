use std::env;
use std::time::Duration;

use crate::error::{Result, RotorError};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Health monitoring configuration
    pub health: HealthConfig,
    /// Proxy validation configuration
    pub validation: ValidationConfig,
    /// Geo lookup configuration
    pub geo: GeoConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Thresholds for the health predicate
///
/// A proxy is healthy iff its health score is at least `min_health_score`
/// and its consecutive failure streak is below `max_consecutive_failures`.
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub min_health_score: f64,
    pub max_consecutive_failures: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            min_health_score: 0.3,
            max_consecutive_failures: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Interval between health sweeps (default: 300s)
    pub check_interval: Duration,
    /// Timeout for a single health probe (default: 10s)
    pub probe_timeout: Duration,
    /// URL fetched through each proxy during a sweep
    pub probe_url: String,
    /// Number of probes dispatched concurrently per sweep
    pub probe_concurrency: usize,
    /// Health predicate thresholds
    pub policy: HealthPolicy,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(300),
            probe_timeout: Duration::from_secs(10),
            probe_url: "http://httpbin.org/ip".to_string(),
            probe_concurrency: 16,
            policy: HealthPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Timeout for each validation attempt (default: 10s)
    pub timeout: Duration,
    /// Ordered what-is-my-ip endpoints tried during validation
    pub test_endpoints: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            test_endpoints: vec![
                "http://httpbin.org/ip".to_string(),
                "https://api.ipify.org".to_string(),
                "http://icanhazip.com".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeoConfig {
    /// Base URL of the ip-api style lookup endpoint; the host to resolve is
    /// appended as a path segment
    pub lookup_url: String,
    /// Timeout for a single lookup
    pub timeout: Duration,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            lookup_url: "http://ip-api.com/json".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            health: HealthConfig {
                check_interval: Duration::from_secs(parse_env(
                    "ROTOR_HEALTH_CHECK_INTERVAL",
                    "300",
                )?),
                probe_timeout: Duration::from_secs(parse_env("ROTOR_PROBE_TIMEOUT", "10")?),
                probe_url: get_env_or("ROTOR_PROBE_URL", "http://httpbin.org/ip"),
                probe_concurrency: parse_env::<usize>("ROTOR_PROBE_CONCURRENCY", "16")?.max(1),
                policy: HealthPolicy {
                    min_health_score: parse_env("ROTOR_MIN_HEALTH_SCORE", "0.3")?,
                    max_consecutive_failures: parse_env("ROTOR_MAX_CONSECUTIVE_FAILURES", "5")?,
                },
            },
            validation: ValidationConfig {
                timeout: Duration::from_secs(parse_env("ROTOR_VALIDATION_TIMEOUT", "10")?),
                test_endpoints: env::var("ROTOR_TEST_ENDPOINTS")
                    .map(|raw| {
                        raw.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                    })
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| ValidationConfig::default().test_endpoints),
            },
            geo: GeoConfig {
                lookup_url: get_env_or("ROTOR_GEO_LOOKUP_URL", "http://ip-api.com/json"),
                timeout: Duration::from_secs(parse_env("ROTOR_GEO_TIMEOUT", "5")?),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            health: HealthConfig::default(),
            validation: ValidationConfig::default(),
            geo: GeoConfig::default(),
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse environment variable with a default, failing on unparseable values
fn parse_env<T: std::str::FromStr>(key: &str, default: &str) -> Result<T> {
    get_env_or(key, default)
        .parse()
        .map_err(|_| RotorError::InvalidConfig(format!("{} must be a valid number", key)))
}
