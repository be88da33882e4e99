// # Probe Store Trait
//
// Defines the interface for the generic record store holding probes.
//
// ## Purpose
//
// The store is the single source of truth for probe state. The registry
// keeps no cache: every operation re-reads through this trait.
//
// ## Implementations
//
// - In-memory: `MemoryProbeStore`
// - File-based: `FileProbeStore` (JSON, atomic writes)
//
// ## Usage
//
// ```rust,ignore
// use sinker_core::{ProbeFilter, ProbeStore};
//
// let store = /* ProbeStore implementation */;
//
// store.insert(&probe).await?;
// let enabled = store.scan(&ProbeFilter::enabled()).await?;
// ```

use async_trait::async_trait;

use crate::probe::{Probe, ProbeFilter};

/// Trait for probe store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// ## Contract
///
/// - `insert` fails if a record with the same id already exists
/// - `update` fails if no record with that id exists
/// - `delete` of a missing id is not an error
/// - `scan` returns records ordered by `created_at`, then `id`
///
/// Stores hold no business rules: uniqueness of enabled keys and the
/// enabled/disabled visibility rules belong to the lifecycle manager.
#[async_trait]
pub trait ProbeStore: Send + Sync {
    /// Insert a new record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Inserted
    /// - `Err(Error)`: Duplicate id or storage error
    async fn insert(&self, probe: &Probe) -> Result<(), crate::Error>;

    /// Read a record by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Probe))`: The stored record
    /// - `Ok(None)`: No record with this id
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: &str) -> Result<Option<Probe>, crate::Error>;

    /// Replace an existing record
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Updated
    /// - `Err(Error)`: Unknown id or storage error
    async fn update(&self, probe: &Probe) -> Result<(), crate::Error>;

    /// Remove a record by id
    async fn delete(&self, id: &str) -> Result<(), crate::Error>;

    /// Return every record matching `filter`
    async fn scan(&self, filter: &ProbeFilter) -> Result<Vec<Probe>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing probe stores from configuration
#[async_trait]
pub trait ProbeStoreFactory: Send + Sync {
    /// Create a ProbeStore instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Serialized `StoreConfig` for this store type
    async fn create(&self, config: &serde_json::Value)
    -> Result<Box<dyn ProbeStore>, crate::Error>;
}

/// Sort scan output into the order the contract promises
pub(crate) fn sort_scan(probes: &mut [Probe]) {
    probes.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
