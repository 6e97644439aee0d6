//! Proxy pool management
//!
//! Validation of candidate proxies, geographic tagging, and the registry
//! that owns the named pools and their metrics.

mod geo;
pub(crate) mod registry;
mod validator;

pub use geo::{GeoLocationProvider, HttpGeoProvider};
pub use registry::{ProxyPoolRegistry, ProxyRequirements};
pub use validator::{HttpValidator, ProxyValidator};
