// # HTTP Geo Lookup
//
// This crate provides an HTTP-based geolocation backend for the Sinker
// probe registry.
//
// ## Purpose
//
// Resolves a probe's IPv4 address through a JSON geolocation service
// (ip-api.com style) when no local geo database is deployed.
//
// ## Protocol
//
// `GET {url}/{ipv4}` must answer with:
//
// ```json
// { "status": "success", "lat": 52.52, "lon": 13.405, "countryCode": "DE" }
// ```
//
// Any other `status` means the service has no data for the address.

use sinker_core::backends::BackendRegistry;
use sinker_core::config::GeoConfig;
use sinker_core::traits::{GeoLocation, GeoLookup, GeoLookupFactory};
use sinker_core::{Error, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::Deserialize;

/// Default request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    country_code: String,
}

impl LookupResponse {
    fn into_location(self) -> Option<GeoLocation> {
        if self.status != "success" {
            tracing::debug!(
                "Geo service has no data: {}",
                self.message.as_deref().unwrap_or(&self.status)
            );
            return None;
        }

        Some(GeoLocation {
            latitude: self.lat?,
            longitude: self.lon?,
            country: self.country_code,
        })
    }
}

/// GeoLookup backed by a JSON web service
pub struct HttpGeoLookup {
    /// Base URL; the address is appended as the last path segment
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpGeoLookup {
    /// Create a lookup against `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a lookup with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn endpoint(&self, ip: Ipv4Addr) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), ip)
    }

    /// Query the service for one address
    async fn fetch(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        let response = self
            .client
            .get(self.endpoint(ip))
            .send()
            .await
            .map_err(|e| Error::geo(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::geo(format!("HTTP error: {}", response.status())));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| Error::geo(format!("Failed to read response: {}", e)))?;

        Ok(body.into_location())
    }
}

#[async_trait::async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn lookup(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        self.fetch(ip).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP geo lookups
pub struct HttpGeoLookupFactory;

#[async_trait::async_trait]
impl GeoLookupFactory for HttpGeoLookupFactory {
    async fn create(&self, config: &GeoConfig) -> Result<Box<dyn GeoLookup>> {
        match config {
            GeoConfig::Http { url, timeout_secs } => {
                tracing::info!("Using HTTP geo lookup at {}", url);
                Ok(Box::new(HttpGeoLookup::with_timeout(
                    url.clone(),
                    Duration::from_secs(*timeout_secs),
                )))
            }
            _ => Err(Error::config("Invalid config for HTTP geo lookup")),
        }
    }
}

/// Register the HTTP geo lookup with a backend registry
pub fn register(backends: &BackendRegistry) {
    backends.register_geo("http", Box::new(HttpGeoLookupFactory));
}
