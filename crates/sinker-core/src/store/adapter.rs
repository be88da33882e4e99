//! Lifecycle-level access to a [`ProbeStore`]
//!
//! The adapter turns the registry's questions ("which enabled probe owns
//! this FQDN?", "load this id or fail") into generic store calls, and maps
//! every backend failure onto [`Error::Store`] so callers see one opaque
//! class of internal error.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::probe::{Probe, ProbeFilter};
use crate::traits::ProbeStore;

/// Probe-aware wrapper around a shared store
#[derive(Clone)]
pub struct ProbeStoreAdapter {
    store: Arc<dyn ProbeStore>,
}

impl ProbeStoreAdapter {
    /// Wrap a store
    pub fn new(store: Arc<dyn ProbeStore>) -> Self {
        Self { store }
    }

    /// Insert a probe that already carries its id
    pub async fn insert(&self, probe: &Probe) -> Result<()> {
        self.store.insert(probe).await.map_err(backend)
    }

    /// Read a probe by id, if present
    pub async fn find(&self, id: &str) -> Result<Option<Probe>> {
        self.store.get(id).await.map_err(backend)
    }

    /// Read a probe by id, failing with [`Error::NotFound`] when absent
    pub async fn require(&self, id: &str) -> Result<Probe> {
        self.find(id).await?.ok_or_else(|| Error::not_found(id))
    }

    /// Write back a mutated probe
    pub async fn update(&self, probe: &Probe) -> Result<()> {
        self.store.update(probe).await.map_err(backend)
    }

    /// Remove a probe by id
    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete(id).await.map_err(backend)
    }

    /// Enabled probes registered under `fqdn`
    pub async fn find_enabled_by_fqdn(&self, fqdn: &str) -> Result<Vec<Probe>> {
        self.scan(&ProbeFilter::enabled().with_fqdn(fqdn)).await
    }

    /// Enabled probes registered under `ipv4`
    pub async fn find_enabled_by_ipv4(&self, ipv4: &str) -> Result<Vec<Probe>> {
        self.scan(&ProbeFilter::enabled().with_ipv4(ipv4)).await
    }

    /// Every enabled probe
    pub async fn list_enabled(&self) -> Result<Vec<Probe>> {
        self.scan(&ProbeFilter::enabled()).await
    }

    /// Flush pending writes
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await.map_err(backend)
    }

    async fn scan(&self, filter: &ProbeFilter) -> Result<Vec<Probe>> {
        self.store.scan(filter).await.map_err(backend)
    }
}

/// Backend failures are never the caller's fault
fn backend(err: Error) -> Error {
    match err {
        Error::Store(_) => err,
        other => Error::store(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProbeStore;

    #[tokio::test]
    async fn test_require_maps_absence_to_not_found() {
        let adapter = ProbeStoreAdapter::new(Arc::new(MemoryProbeStore::new()));

        let err = adapter.require("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "missing"));
        assert!(adapter.find("missing").await.unwrap().is_none());
    }

    #[test]
    fn test_backend_errors_become_store_errors() {
        let err = backend(Error::config("bad path"));
        assert!(matches!(err, Error::Store(_)));
        assert!(err.is_internal());
    }
}
