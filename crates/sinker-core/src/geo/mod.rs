//! Geolocation enrichment
//!
//! [`GeoEnricher`] fills a probe's coordinates and country from its IPv4
//! address. Enrichment is best-effort: a backend error or a missing record
//! is logged and the probe keeps the unknown sentinels.

pub mod file;

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Error;
use crate::config::GeoConfig;
use crate::probe::Probe;
use crate::traits::{GeoLocation, GeoLookup, GeoLookupFactory};

pub use file::{FileGeoDatabase, FileGeoDatabaseFactory};

/// Best-effort location enrichment over a [`GeoLookup`]
#[derive(Clone)]
pub struct GeoEnricher {
    lookup: Arc<dyn GeoLookup>,
}

impl GeoEnricher {
    /// Create an enricher backed by `lookup`
    pub fn new(lookup: Arc<dyn GeoLookup>) -> Self {
        Self { lookup }
    }

    /// Resolve an IPv4 string to a location, swallowing every failure
    pub async fn locate(&self, ipv4: &str) -> Option<GeoLocation> {
        let ip: Ipv4Addr = match ipv4.parse() {
            Ok(ip) => ip,
            Err(_) => {
                debug!("Skipping geo lookup for unparsable address {}", ipv4);
                return None;
            }
        };

        match self.lookup.lookup(ip).await {
            Ok(Some(location)) => Some(location),
            Ok(None) => {
                debug!("No geo data for {} ({})", ip, self.lookup.backend_name());
                None
            }
            Err(e) => {
                warn!(
                    "Geo lookup for {} failed ({}): {}",
                    ip,
                    self.lookup.backend_name(),
                    e
                );
                None
            }
        }
    }

    /// Overwrite the probe's location fields when the lookup has data
    ///
    /// Returns whether the probe was changed.
    pub async fn enrich(&self, probe: &mut Probe) -> bool {
        let Some(location) = self.locate(&probe.ipv4).await else {
            return false;
        };

        probe.geo_latitude = location.latitude.to_string();
        probe.geo_longitude = location.longitude.to_string();
        probe.country = location.country;
        true
    }
}

/// Geo backend that never has data
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLookup;

#[async_trait]
impl GeoLookup for NoGeoLookup {
    async fn lookup(&self, _ip: Ipv4Addr) -> Result<Option<GeoLocation>, Error> {
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}

/// Factory for the `none` geo type
pub struct NoGeoLookupFactory;

#[async_trait]
impl GeoLookupFactory for NoGeoLookupFactory {
    async fn create(&self, _config: &GeoConfig) -> Result<Box<dyn GeoLookup>, Error> {
        Ok(Box::new(NoGeoLookup))
    }
}
