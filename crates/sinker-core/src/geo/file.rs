// # File Geo Database
//
// GeoLookup backed by a table of IPv4 networks loaded from a JSON file at
// startup. The most specific (longest-prefix) network containing the
// address wins.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "networks": [
//     { "network": "203.0.113.0/24", "latitude": 40.4168, "longitude": -3.7038, "country": "ES" }
//   ]
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::Error;
use crate::config::GeoConfig;
use crate::traits::{GeoLocation, GeoLookup, GeoLookupFactory};

/// Geo database format version
const GEO_FILE_VERSION: &str = "1.0";

#[derive(Debug, serde::Deserialize)]
struct GeoFileFormat {
    version: String,
    networks: Vec<GeoFileEntry>,
}

#[derive(Debug, serde::Deserialize)]
struct GeoFileEntry {
    network: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: String,
}

#[derive(Debug, Clone)]
struct Network {
    base: u32,
    prefix: u8,
    location: GeoLocation,
}

impl Network {
    fn mask(&self) -> u32 {
        prefix_mask(self.prefix)
    }

    fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask() == self.base
    }
}

fn prefix_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

/// Parse `a.b.c.d/len` into (masked base, prefix length)
fn parse_cidr(cidr: &str) -> Result<(u32, u8), Error> {
    let (addr, prefix) = cidr
        .split_once('/')
        .ok_or_else(|| Error::geo(format!("network '{}' lacks a prefix length", cidr)))?;

    let addr: Ipv4Addr = addr
        .parse()
        .map_err(|e| Error::geo(format!("network '{}': {}", cidr, e)))?;
    let prefix: u8 = prefix
        .parse()
        .ok()
        .filter(|p| *p <= 32)
        .ok_or_else(|| Error::geo(format!("network '{}': prefix must be 0-32", cidr)))?;

    Ok((u32::from(addr) & prefix_mask(prefix), prefix))
}

/// In-memory CIDR table loaded from disk
#[derive(Debug, Clone, Default)]
pub struct FileGeoDatabase {
    /// Sorted most specific first
    networks: Vec<Network>,
}

impl FileGeoDatabase {
    /// Load a geo database file
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::geo(format!(
                "Failed to read geo database {}: {}",
                path.display(),
                e
            ))
        })?;

        let db = Self::from_json(&content)?;
        tracing::info!(
            "Loaded {} geo networks from {}",
            db.networks.len(),
            path.display()
        );
        Ok(db)
    }

    /// Parse a geo database document
    pub fn from_json(content: &str) -> Result<Self, Error> {
        let file: GeoFileFormat = serde_json::from_str(content)?;
        if file.version != GEO_FILE_VERSION {
            tracing::warn!(
                "Geo database version mismatch: expected {}, got {}. Loading anyway.",
                GEO_FILE_VERSION,
                file.version
            );
        }

        let mut networks = Vec::with_capacity(file.networks.len());
        for entry in file.networks {
            let (base, prefix) = parse_cidr(&entry.network)?;
            if !(-90.0..=90.0).contains(&entry.latitude) {
                return Err(Error::geo(format!(
                    "network '{}': latitude {} out of range",
                    entry.network, entry.latitude
                )));
            }
            networks.push(Network {
                base,
                prefix,
                location: GeoLocation {
                    latitude: entry.latitude,
                    longitude: entry.longitude,
                    country: entry.country,
                },
            });
        }

        networks.sort_by(|a, b| b.prefix.cmp(&a.prefix));
        Ok(Self { networks })
    }

    /// Number of networks in the table
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

#[async_trait]
impl GeoLookup for FileGeoDatabase {
    async fn lookup(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>, Error> {
        Ok(self
            .networks
            .iter()
            .find(|network| network.contains(ip))
            .map(|network| network.location.clone()))
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for the `file` geo type
pub struct FileGeoDatabaseFactory;

#[async_trait]
impl GeoLookupFactory for FileGeoDatabaseFactory {
    async fn create(&self, config: &GeoConfig) -> Result<Box<dyn GeoLookup>, Error> {
        match config {
            GeoConfig::File { path } => Ok(Box::new(FileGeoDatabase::open(path).await?)),
            _ => Err(Error::config("Invalid config for file geo database")),
        }
    }
}
