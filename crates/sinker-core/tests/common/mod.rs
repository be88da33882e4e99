//! Test doubles and common utilities for registry contract tests
//!
//! The doubles wrap real in-crate components where possible so the
//! contracts run against the same store semantics production uses.

#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sinker_core::config::ProbeDefaults;
use sinker_core::error::{Error, Result};
use sinker_core::probe::{Probe, ProbeFilter};
use sinker_core::traits::{GeoLocation, GeoLookup, ProbeStore};
use sinker_core::{LifecycleManager, MemoryProbeStore, NoGeoLookup};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// A ProbeStore that counts writes and can be told to fail them
pub struct MockProbeStore {
    inner: MemoryProbeStore,
    /// Call counter for insert()
    insert_call_count: AtomicUsize,
    /// Call counter for update()
    update_call_count: AtomicUsize,
    /// Call counter for delete()
    delete_call_count: AtomicUsize,
    /// Call counter for flush()
    flush_call_count: AtomicUsize,
    /// When set, every write returns a store error
    fail_writes: AtomicBool,
}

impl MockProbeStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryProbeStore::new(),
            insert_call_count: AtomicUsize::new(0),
            update_call_count: AtomicUsize::new(0),
            delete_call_count: AtomicUsize::new(0),
            flush_call_count: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every following write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Get the number of times insert() was called
    pub fn insert_call_count(&self) -> usize {
        self.insert_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times delete() was called
    pub fn delete_call_count(&self) -> usize {
        self.delete_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times flush() was called
    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    /// Number of records held, enabled or not
    pub async fn record_count(&self) -> usize {
        self.inner.len().await
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProbeStore for MockProbeStore {
    async fn insert(&self, probe: &Probe) -> Result<()> {
        self.insert_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.insert(probe).await
    }

    async fn get(&self, id: &str) -> Result<Option<Probe>> {
        self.inner.get(id).await
    }

    async fn update(&self, probe: &Probe) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.update(probe).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_call_count.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.delete(id).await
    }

    async fn scan(&self, filter: &ProbeFilter) -> Result<Vec<Probe>> {
        self.inner.scan(filter).await
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A GeoLookup that always answers with the same location
pub struct StaticGeoLookup {
    location: GeoLocation,
    /// Call counter for lookup()
    lookup_call_count: AtomicUsize,
}

impl StaticGeoLookup {
    pub fn new(latitude: f64, longitude: f64, country: &str) -> Self {
        Self {
            location: GeoLocation {
                latitude,
                longitude,
                country: country.to_string(),
            },
            lookup_call_count: AtomicUsize::new(0),
        }
    }

    /// Get the number of times lookup() was called
    pub fn lookup_call_count(&self) -> usize {
        self.lookup_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GeoLookup for StaticGeoLookup {
    async fn lookup(&self, _ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        self.lookup_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.location.clone()))
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}

/// A GeoLookup whose backend is always down
pub struct FailingGeoLookup;

#[async_trait::async_trait]
impl GeoLookup for FailingGeoLookup {
    async fn lookup(&self, _ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        Err(Error::geo("geo backend unreachable"))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// A GeoLookup that parks lookups of one address until released
///
/// Every other address answers immediately with no data.
pub struct GatedGeoLookup {
    gated: Ipv4Addr,
    entered: Notify,
    released: Notify,
}

impl GatedGeoLookup {
    pub fn new(gated: Ipv4Addr) -> Self {
        Self {
            gated,
            entered: Notify::new(),
            released: Notify::new(),
        }
    }

    /// Wait until a lookup of the gated address has started
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let the parked lookup finish
    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait::async_trait]
impl GeoLookup for GatedGeoLookup {
    async fn lookup(&self, ip: Ipv4Addr) -> Result<Option<GeoLocation>> {
        if ip == self.gated {
            self.entered.notify_one();
            self.released.notified().await;
        }
        Ok(None)
    }

    fn backend_name(&self) -> &'static str {
        "gated"
    }
}

/// Manager over a fresh memory store with no geo data
pub fn memory_manager() -> LifecycleManager {
    LifecycleManager::new(
        Arc::new(MemoryProbeStore::new()),
        Arc::new(NoGeoLookup),
        ProbeDefaults::default(),
    )
}

/// Manager over a shared mock store and the given geo lookup
pub fn manager_with(store: &Arc<MockProbeStore>, geo: Arc<dyn GeoLookup>) -> LifecycleManager {
    LifecycleManager::new(store.clone(), geo, ProbeDefaults::default())
}

/// Base64-encode raw key material
pub fn b64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
