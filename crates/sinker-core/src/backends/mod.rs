//! Plugin-based backend registry
//!
//! Probe stores and geo lookups are created by name from configuration,
//! avoiding hardcoded if-else chains in the daemon.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sinker_core::backends::BackendRegistry;
//! use sinker_core::config::RegistryConfig;
//!
//! let backends = BackendRegistry::with_builtins();
//! sinker_geo_http::register(&backends);
//!
//! let store = backends.create_store(&config.store).await?;
//! let geo = backends.create_geo(&config.geo).await?;
//! ```
//!
//! ## Registration
//!
//! Plugin crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(backends: &BackendRegistry) {
//!     backends.register_geo("http", Box::new(HttpGeoLookupFactory));
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{GeoConfig, StoreConfig};
use crate::error::{Error, Result};
use crate::geo::{FileGeoDatabaseFactory, NoGeoLookupFactory};
use crate::store::{FileProbeStoreFactory, MemoryProbeStoreFactory};
use crate::traits::{GeoLookup, GeoLookupFactory, ProbeStore, ProbeStoreFactory};

/// Named factories for stores and geo lookups
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: concurrent lookups, exclusive
/// registration. Factories are cloned out of the map before the async
/// `create` call so no lock is held across an await.
#[derive(Default)]
pub struct BackendRegistry {
    stores: RwLock<HashMap<String, Arc<dyn ProbeStoreFactory>>>,
    geo: RwLock<HashMap<String, Arc<dyn GeoLookupFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the in-crate backends: `memory`/`file` stores and
    /// `none`/`file` geo lookups
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryProbeStoreFactory));
        registry.register_store("file", Box::new(FileProbeStoreFactory));
        registry.register_geo("none", Box::new(NoGeoLookupFactory));
        registry.register_geo("file", Box::new(FileGeoDatabaseFactory));
        registry
    }

    /// Register a probe store factory
    pub fn register_store(&self, name: impl Into<String>, factory: Box<dyn ProbeStoreFactory>) {
        let mut stores = self.stores.write().unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Register a geo lookup factory
    pub fn register_geo(&self, name: impl Into<String>, factory: Box<dyn GeoLookupFactory>) {
        let mut geo = self.geo.write().unwrap_or_else(PoisonError::into_inner);
        geo.insert(name.into(), Arc::from(factory));
    }

    /// Create a probe store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ProbeStore>)`: Created store
    /// - `Err(Error)`: Unknown store type or creation failure
    pub async fn create_store(&self, config: &StoreConfig) -> Result<Box<dyn ProbeStore>> {
        let factory = {
            let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
            stores
                .get(config.type_name())
                .cloned()
                .ok_or_else(|| {
                    Error::config(format!("Unknown store type: {}", config.type_name()))
                })?
        };

        let config_json = serde_json::to_value(config)?;
        factory.create(&config_json).await
    }

    /// Create a geo lookup from configuration
    pub async fn create_geo(&self, config: &GeoConfig) -> Result<Box<dyn GeoLookup>> {
        let factory = {
            let geo = self.geo.read().unwrap_or_else(PoisonError::into_inner);
            geo.get(config.type_name()).cloned().ok_or_else(|| {
                Error::config(format!("Unknown geo type: {}", config.type_name()))
            })?
        };

        factory.create(config).await
    }

    /// List registered store types
    pub fn list_stores(&self) -> Vec<String> {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.keys().cloned().collect()
    }

    /// List registered geo types
    pub fn list_geo(&self) -> Vec<String> {
        let geo = self.geo.read().unwrap_or_else(PoisonError::into_inner);
        geo.keys().cloned().collect()
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap_or_else(PoisonError::into_inner);
        stores.contains_key(name)
    }

    /// Check if a geo type is registered
    pub fn has_geo(&self, name: &str) -> bool {
        let geo = self.geo.read().unwrap_or_else(PoisonError::into_inner);
        geo.contains_key(name)
    }
}
