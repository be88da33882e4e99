//! Configuration types for the probe registry
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Default directory probes write their traces to
pub const DEFAULT_TRACES_PATH: &str = "/var/lib/sinker/traces";

/// Main registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Probe store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Geolocation backend configuration
    #[serde(default)]
    pub geo: GeoConfig,

    /// Field defaults applied at registration
    #[serde(default)]
    pub defaults: ProbeDefaults,
}

impl RegistryConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.geo.validate()?;
        self.defaults.validate()?;
        Ok(())
    }
}

/// Probe store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// File-based store
    File {
        /// Path to the JSON store file
        path: String,
    },

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File store path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Geolocation backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeoConfig {
    /// No geolocation; probes keep unknown coordinates
    #[default]
    None,

    /// CIDR table loaded from a JSON file
    File {
        /// Path to the geo database file
        path: String,
    },

    /// HTTP lookup service
    Http {
        /// Base URL; the address is appended as the last path segment
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_geo_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom geo backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl GeoConfig {
    /// Validate the geo configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            GeoConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Geo database path cannot be empty"));
                }
                Ok(())
            }
            GeoConfig::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Geo lookup URL cannot be empty"));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Geo lookup timeout must be > 0"));
                }
                Ok(())
            }
            GeoConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom geo factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom geo config cannot be null"));
                }
                Ok(())
            }
            GeoConfig::None => Ok(()),
        }
    }

    /// Get the geo backend type name
    pub fn type_name(&self) -> &str {
        match self {
            GeoConfig::None => "none",
            GeoConfig::File { .. } => "file",
            GeoConfig::Http { .. } => "http",
            GeoConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Field defaults applied before caller input at registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeDefaults {
    /// Traces path for probes that do not supply one
    #[serde(default = "default_traces_path")]
    pub traces_path: String,
}

impl ProbeDefaults {
    /// Validate the defaults
    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validation::validate_traces_path(&self.traces_path)
            .map_err(|e| crate::Error::config(format!("Default traces path rejected: {}", e)))
    }
}

impl Default for ProbeDefaults {
    fn default() -> Self {
        Self {
            traces_path: default_traces_path(),
        }
    }
}

fn default_traces_path() -> String {
    DEFAULT_TRACES_PATH.to_string()
}

fn default_geo_timeout_secs() -> u64 {
    5
}
