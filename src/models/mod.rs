//! Data models for the proxy pool

mod metrics;
mod proxy;

pub use metrics::{ProxyMetrics, RESPONSE_TIME_WINDOW};
pub use proxy::{proxy_id, GeoLocation, PoolType, Proxy, ProxyId};
