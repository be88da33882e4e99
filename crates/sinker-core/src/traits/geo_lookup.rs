// # Geo Lookup Trait
//
// Defines the interface for resolving an IPv4 address to a location.
//
// ## Implementations
//
// - `NoGeoLookup`: never has data
// - `FileGeoDatabase`: CIDR table loaded from a JSON file
// - HTTP lookup service: `sinker-geo-http` crate
//
// The registry treats lookups as best-effort. An error or `None` leaves the
// probe with unknown coordinates; registration continues.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Location data for an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// ISO country code
    pub country: String,
}

/// Trait for geolocation backends
///
/// Implementations must be thread-safe and must not retry internally;
/// a single failed lookup is simply reported.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Look up `ip`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(GeoLocation))`: Location known
    /// - `Ok(None)`: No data for this address
    /// - `Err(Error)`: Backend failure
    async fn lookup(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>, crate::Error>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing geo lookups from configuration
#[async_trait]
pub trait GeoLookupFactory: Send + Sync {
    /// Create a GeoLookup instance from configuration
    async fn create(
        &self,
        config: &crate::config::GeoConfig,
    ) -> Result<Box<dyn GeoLookup>, crate::Error>;
}
