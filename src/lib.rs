//! Rotor - Outbound Proxy Pool Rotation
//!
//! Manages named pools of outbound proxy endpoints, continuously assesses
//! their health, and selects an optimal endpoint per request.
//!
//! ## Features
//!
//! - Four named pools (residential, datacenter, mobile, free) with
//!   validation at admission time
//! - Six rotation strategies (round-robin, least-used, failure-aware,
//!   geographic, random, fastest)
//! - Derived per-proxy health scoring from success rate, failure streaks,
//!   success recency, and speed
//! - Background health monitoring with concurrent probes and automatic
//!   eviction
//! - Best-effort geographic tagging via a pluggable lookup collaborator

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod monitor;
pub mod pool;
pub mod rotation;

pub use config::Config;
pub use error::{Result, RotorError};
pub use manager::{ProxyRotationManager, Statistics};
pub use pool::ProxyRequirements;
