//! Probe record types
//!
//! A [`Probe`] is the single entity tracked by the registry. Callers submit
//! a [`NewProbe`]; the lifecycle manager overlays it on the configured
//! defaults to produce the record that gets validated, enriched and stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProbeDefaults;

/// Sentinel stored in the geo coordinate fields when the location is unknown
pub const GEO_UNKNOWN: &str = "NaN";

/// Hosting provider a probe runs on
///
/// `Invalid` is produced only when a provider name fails to parse. The
/// validator rejects it, so it never reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    DigitalOcean,
    Vultr,
    Aws,
    GoogleCloud,
    Linode,
    Hetzner,
    Invalid,
}

/// Canonical wire names, in both directions
const PROVIDER_NAMES: &[(Provider, &str)] = &[
    (Provider::DigitalOcean, "DigitalOcean"),
    (Provider::Vultr, "Vultr"),
    (Provider::Aws, "AWS"),
    (Provider::GoogleCloud, "GoogleCloud"),
    (Provider::Linode, "Linode"),
    (Provider::Hetzner, "Hetzner"),
];

impl Provider {
    /// Resolve a provider from its name (ASCII case-insensitive)
    ///
    /// Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        PROVIDER_NAMES
            .iter()
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(name.trim()))
            .map(|(provider, _)| *provider)
    }

    /// Parse a provider name, mapping unknown names to [`Provider::Invalid`]
    pub fn parse(name: &str) -> Self {
        Self::from_name(name).unwrap_or(Provider::Invalid)
    }

    /// Canonical name of this provider
    pub fn name(&self) -> &'static str {
        PROVIDER_NAMES
            .iter()
            .find(|(provider, _)| provider == self)
            .map(|(_, name)| *name)
            .unwrap_or("invalid")
    }

    /// Whether this is a real provider rather than the parse-failure sentinel
    pub fn is_valid(&self) -> bool {
        *self != Provider::Invalid
    }

    /// All real providers
    pub fn all() -> impl Iterator<Item = Provider> {
        PROVIDER_NAMES.iter().map(|(provider, _)| *provider)
    }
}

impl From<String> for Provider {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<Provider> for String {
    fn from(provider: Provider) -> Self {
        provider.name().to_string()
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered measurement probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    /// Content-derived identifier (empty until inserted)
    pub id: String,
    pub fqdn: String,
    pub ipv4: String,
    /// IPv6 literal, empty when the probe has none
    pub ipv6: String,
    pub provider: Provider,
    /// Decimal longitude or [`GEO_UNKNOWN`]
    pub geo_longitude: String,
    /// Decimal latitude or [`GEO_UNKNOWN`]
    pub geo_latitude: String,
    /// Country code, empty when unknown
    pub country: String,
    /// Base64-encoded SSH private key
    pub ssh_private_key: String,
    /// Base64-encoded SSH public key
    pub ssh_public_key: String,
    pub traces_path: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Probe {
    /// Refresh `updated_at` after a mutation
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether both geo coordinates are still the unknown sentinel
    pub fn has_unknown_location(&self) -> bool {
        self.geo_latitude == GEO_UNKNOWN && self.geo_longitude == GEO_UNKNOWN
    }
}

/// Caller-supplied registration input
///
/// Every field left as `None` falls back to the registry defaults; every
/// supplied field wins over its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProbe {
    pub fqdn: String,
    pub ipv4: String,
    pub provider: String,
    pub ipv6: Option<String>,
    pub geo_longitude: Option<String>,
    pub geo_latitude: Option<String>,
    pub country: Option<String>,
    pub ssh_private_key: Option<String>,
    pub ssh_public_key: Option<String>,
    pub traces_path: Option<String>,
    pub enabled: Option<bool>,
}

impl NewProbe {
    /// Create registration input with the three mandatory keys
    pub fn new(
        fqdn: impl Into<String>,
        ipv4: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            fqdn: fqdn.into(),
            ipv4: ipv4.into(),
            provider: provider.into(),
            ..Self::default()
        }
    }

    /// Set the IPv6 address
    pub fn with_ipv6(mut self, ipv6: impl Into<String>) -> Self {
        self.ipv6 = Some(ipv6.into());
        self
    }

    /// Set explicit coordinates
    pub fn with_location(
        mut self,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        self.geo_latitude = Some(latitude.into());
        self.geo_longitude = Some(longitude.into());
        self
    }

    /// Set base64-encoded SSH keys
    pub fn with_ssh_keys(
        mut self,
        private_key: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        self.ssh_private_key = Some(private_key.into());
        self.ssh_public_key = Some(public_key.into());
        self
    }

    /// Set the traces path
    pub fn with_traces_path(mut self, path: impl Into<String>) -> Self {
        self.traces_path = Some(path.into());
        self
    }

    /// Register the probe already enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Build the pre-insert record: defaults first, caller input on top
    pub fn into_probe(self, defaults: &ProbeDefaults, now: DateTime<Utc>) -> Probe {
        Probe {
            id: String::new(),
            fqdn: self.fqdn,
            ipv4: self.ipv4,
            ipv6: self.ipv6.unwrap_or_default(),
            provider: Provider::parse(&self.provider),
            geo_longitude: self
                .geo_longitude
                .unwrap_or_else(|| GEO_UNKNOWN.to_string()),
            geo_latitude: self
                .geo_latitude
                .unwrap_or_else(|| GEO_UNKNOWN.to_string()),
            country: self.country.unwrap_or_default(),
            ssh_private_key: self.ssh_private_key.unwrap_or_default(),
            ssh_public_key: self.ssh_public_key.unwrap_or_default(),
            traces_path: self
                .traces_path
                .unwrap_or_else(|| defaults.traces_path.clone()),
            enabled: self.enabled.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Equality conjunction used to scan the store
///
/// `None` fields do not constrain the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeFilter {
    pub enabled: Option<bool>,
    pub fqdn: Option<String>,
    pub ipv4: Option<String>,
}

impl ProbeFilter {
    /// Only enabled probes
    pub fn enabled() -> Self {
        Self {
            enabled: Some(true),
            ..Self::default()
        }
    }

    /// Narrow to a FQDN
    pub fn with_fqdn(mut self, fqdn: impl Into<String>) -> Self {
        self.fqdn = Some(fqdn.into());
        self
    }

    /// Narrow to an IPv4 address
    pub fn with_ipv4(mut self, ipv4: impl Into<String>) -> Self {
        self.ipv4 = Some(ipv4.into());
        self
    }

    /// Check a probe against every set field
    pub fn matches(&self, probe: &Probe) -> bool {
        self.enabled.is_none_or(|enabled| probe.enabled == enabled)
            && self.fqdn.as_deref().is_none_or(|fqdn| probe.fqdn == fqdn)
            && self.ipv4.as_deref().is_none_or(|ipv4| probe.ipv4 == ipv4)
    }
}

/// Decoded SSH key pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub private_key: Vec<u8>,
    pub public_key: Vec<u8>,
}
