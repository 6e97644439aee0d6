//! Geographic location lookups
//!
//! Best-effort collaborator: a failed lookup simply yields no location and
//! never blocks admission or selection.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::GeoConfig;
use crate::models::GeoLocation;

/// Resolves a host or IP to a geographic location
#[async_trait]
pub trait GeoLocationProvider: Send + Sync {
    async fn locate(&self, host: &str) -> Option<GeoLocation>;
}

/// ip-api style JSON lookup over HTTP
pub struct HttpGeoProvider {
    client: reqwest::Client,
    lookup_url: String,
}

/// Response shape of the ip-api JSON endpoint
#[derive(Debug, Deserialize)]
struct GeoResponse {
    status: String,
    #[serde(default)]
    country: String,
    #[serde(default, rename = "regionName")]
    region_name: String,
    #[serde(default)]
    city: String,
}

impl HttpGeoProvider {
    pub fn new(config: &GeoConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            lookup_url: config.lookup_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl GeoLocationProvider for HttpGeoProvider {
    async fn locate(&self, host: &str) -> Option<GeoLocation> {
        let url = format!("{}/{}", self.lookup_url, host);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("Geo lookup for {} failed: {}", host, e);
                return None;
            }
        };

        let body: GeoResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                debug!("Geo lookup for {} returned invalid body: {}", host, e);
                return None;
            }
        };

        if body.status != "success" {
            debug!("Geo lookup for {} returned status {}", host, body.status);
            return None;
        }

        Some(GeoLocation {
            country: body.country,
            region: body.region_name,
            city: body.city,
        })
    }
}
