// # Memory Probe Store
//
// In-memory implementation of ProbeStore.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for embedding the registry in short-lived tools.
//
// ## Crash Behavior
//
// - All probes are lost on restart/crash
// - Clients must register again after a restart

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::probe::{Probe, ProbeFilter};
use crate::traits::probe_store::{ProbeStore, ProbeStoreFactory, sort_scan};

/// In-memory probe store implementation
///
/// This implementation stores all probes in a HashMap keyed by id,
/// protected by a RwLock. It provides no persistence across restarts.
///
/// # Example
///
/// ```rust,no_run
/// use sinker_core::store::MemoryProbeStore;
/// use sinker_core::traits::ProbeStore;
/// use sinker_core::ProbeFilter;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryProbeStore::new();
///
///     let enabled = store.scan(&ProbeFilter::enabled()).await?;
///     assert!(enabled.is_empty());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProbeStore {
    inner: Arc<RwLock<HashMap<String, Probe>>>,
}

impl MemoryProbeStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of probes in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl Default for MemoryProbeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbeStore for MemoryProbeStore {
    async fn insert(&self, probe: &Probe) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(&probe.id) {
            return Err(Error::store(format!("duplicate probe id {}", probe.id)));
        }
        guard.insert(probe.id.clone(), probe.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Probe>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(id).cloned())
    }

    async fn update(&self, probe: &Probe) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&probe.id) {
            Some(slot) => {
                *slot = probe.clone();
                Ok(())
            }
            None => Err(Error::store(format!("cannot update missing probe {}", probe.id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(id);
        Ok(())
    }

    async fn scan(&self, filter: &ProbeFilter) -> Result<Vec<Probe>, Error> {
        let guard = self.inner.read().await;
        let mut probes: Vec<Probe> = guard
            .values()
            .filter(|probe| filter.matches(probe))
            .cloned()
            .collect();
        sort_scan(&mut probes);
        Ok(probes)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}

/// Factory for the `memory` store type
pub struct MemoryProbeStoreFactory;

#[async_trait]
impl ProbeStoreFactory for MemoryProbeStoreFactory {
    async fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn ProbeStore>, Error> {
        Ok(Box::new(MemoryProbeStore::new()))
    }
}
