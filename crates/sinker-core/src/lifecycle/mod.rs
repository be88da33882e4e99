//! Probe lifecycle manager
//!
//! The LifecycleManager is responsible for:
//! - Registering probes (defaults, identity, validation, enrichment)
//! - Looking probes up by id, IPv4 address or FQDN
//! - Enabling, disabling and deleting probes
//! - Rotating and reading SSH credentials
//! - Changing a probe's traces path
//!
//! ## Architecture
//!
//! ```text
//!                 ┌───────────────────┐
//!   NewProbe ───▶ │ LifecycleManager  │
//!                 └───────────────────┘
//!                           │
//!      ┌──────────────┬─────┴────────┬───────────────┐
//!      ▼              ▼              ▼               ▼
//! ┌──────────┐  ┌───────────┐  ┌────────────┐  ┌───────────────────┐
//! │ identity │  │ validation│  │ GeoEnricher│  │ ProbeStoreAdapter │
//! └──────────┘  └───────────┘  └────────────┘  └───────────────────┘
//! ```
//!
//! ## Registration Flow
//!
//! 1. Overlay the caller's fields on the defaults
//! 2. Derive the id from that pre-enrichment content
//! 3. Validate
//! 4. Enrich with geolocation (best-effort)
//! 5. Validate again, with the same routine
//! 6. Insert
//!
//! The id is not recomputed after enrichment, so it reflects the
//! pre-enrichment content only.
//!
//! ## Concurrency
//!
//! Every store write runs under one async mutex, so the uniqueness check and
//! the write that depends on it cannot interleave with another writer on
//! the same manager. Registration validates and enriches before taking the
//! mutex and repeats validation once it holds it, so a slow geo backend
//! never blocks other writers. Reads take no lock; the store is the only
//! source of truth and nothing is cached here.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::backends::BackendRegistry;
use crate::config::{ProbeDefaults, RegistryConfig};
use crate::error::{Error, Result};
use crate::geo::GeoEnricher;
use crate::identity;
use crate::probe::{Credentials, NewProbe, Probe};
use crate::store::ProbeStoreAdapter;
use crate::traits::{GeoLookup, ProbeStore};
use crate::validation;

/// Orchestrates every public probe operation
pub struct LifecycleManager {
    store: ProbeStoreAdapter,
    enricher: GeoEnricher,
    defaults: ProbeDefaults,
    write_lock: Mutex<()>,
}

impl LifecycleManager {
    /// Create a manager over explicit dependencies
    pub fn new(
        store: Arc<dyn ProbeStore>,
        geo: Arc<dyn GeoLookup>,
        defaults: ProbeDefaults,
    ) -> Self {
        Self {
            store: ProbeStoreAdapter::new(store),
            enricher: GeoEnricher::new(geo),
            defaults,
            write_lock: Mutex::new(()),
        }
    }

    /// Validate `config` and build the store and geo backends it names
    pub async fn from_config(config: &RegistryConfig, backends: &BackendRegistry) -> Result<Self> {
        config.validate()?;

        let store = backends.create_store(&config.store).await?;
        let geo = backends.create_geo(&config.geo).await?;
        info!(
            "Registry backends ready (store: {}, geo: {})",
            config.store.type_name(),
            geo.backend_name()
        );

        Ok(Self::new(
            Arc::from(store),
            Arc::from(geo),
            config.defaults.clone(),
        ))
    }

    /// Register a new probe and return its id
    ///
    /// The probe is stored disabled unless the caller asked otherwise.
    pub async fn register(&self, input: NewProbe) -> Result<String> {
        let mut probe = input.into_probe(&self.defaults, Utc::now());
        let id = identity::derive_id(&probe);
        debug!("Registering {} ({}) as {}", probe.fqdn, probe.ipv4, id);

        validation::validate(&probe, &self.store).await?;
        if self.enricher.enrich(&mut probe).await {
            debug!(
                "Located {} at {},{} ({})",
                probe.ipv4, probe.geo_latitude, probe.geo_longitude, probe.country
            );
        }

        let _guard = self.write_lock.lock().await;
        validation::validate(&probe, &self.store).await?;

        probe.id = id;
        self.store
            .insert(&probe)
            .await
            .inspect_err(|e| error!("Failed to insert probe {}: {}", probe.id, e))?;

        info!("Registered probe {} ({}, {})", probe.id, probe.fqdn, probe.ipv4);
        Ok(probe.id)
    }

    /// Read a probe by id, enabled or not
    pub async fn lookup_by_id(&self, id: &str) -> Result<Probe> {
        self.store.require(id).await.inspect_err(log_internal)
    }

    /// Enabled probes with this IPv4 address
    pub async fn lookup_by_ipv4(&self, ipv4: &str) -> Result<Vec<Probe>> {
        validation::validate_ipv4(ipv4)?;
        self.store
            .find_enabled_by_ipv4(ipv4)
            .await
            .inspect_err(log_internal)
    }

    /// Enabled probes with this FQDN
    pub async fn lookup_by_fqdn(&self, fqdn: &str) -> Result<Vec<Probe>> {
        validation::validate_fqdn(fqdn)?;
        self.store
            .find_enabled_by_fqdn(fqdn)
            .await
            .inspect_err(log_internal)
    }

    /// Every enabled probe
    pub async fn list_all(&self) -> Result<Vec<Probe>> {
        self.store.list_enabled().await.inspect_err(log_internal)
    }

    /// Number of enabled probes
    pub async fn count_enabled(&self) -> Result<usize> {
        Ok(self.list_all().await?.len())
    }

    /// Enable a probe
    ///
    /// Fails with a conflict if another enabled probe already holds the
    /// same FQDN or IPv4 address.
    pub async fn enable(&self, id: &str) -> Result<Probe> {
        let _guard = self.write_lock.lock().await;

        let mut probe = self.store.require(id).await?;
        validation::ensure_unique(&probe, &self.store).await?;

        probe.enabled = true;
        self.write_back(&mut probe).await?;
        info!("Enabled probe {}", id);
        Ok(probe)
    }

    /// Disable a probe
    pub async fn disable(&self, id: &str) -> Result<Probe> {
        let _guard = self.write_lock.lock().await;

        let mut probe = self.store.require(id).await?;
        probe.enabled = false;
        self.write_back(&mut probe).await?;
        info!("Disabled probe {}", id);
        Ok(probe)
    }

    /// Replace both SSH keys
    ///
    /// Both keys must be base64; if either is not, nothing is written.
    pub async fn rotate_credentials(
        &self,
        id: &str,
        private_key: &str,
        public_key: &str,
    ) -> Result<Probe> {
        validation::validate_credentials(private_key, public_key)?;

        let _guard = self.write_lock.lock().await;

        let mut probe = self.store.require(id).await?;
        probe.ssh_private_key = private_key.to_string();
        probe.ssh_public_key = public_key.to_string();
        self.write_back(&mut probe).await?;
        info!("Rotated credentials for probe {}", id);
        Ok(probe)
    }

    /// Decode and return a probe's SSH keys
    pub async fn get_credentials(&self, id: &str) -> Result<Credentials> {
        let probe = self.store.require(id).await.inspect_err(log_internal)?;

        if probe.ssh_private_key.is_empty() || probe.ssh_public_key.is_empty() {
            return Err(Error::credential_format("partial credential material"));
        }
        validation::validate_credentials(&probe.ssh_private_key, &probe.ssh_public_key)?;

        let private_key = validation::decode_key("ssh_private_key", &probe.ssh_private_key)
            .inspect_err(log_internal)?;
        let public_key = validation::decode_key("ssh_public_key", &probe.ssh_public_key)
            .inspect_err(log_internal)?;

        Ok(Credentials {
            private_key,
            public_key,
        })
    }

    /// Change where a probe writes its traces
    ///
    /// The path is checked before the probe is looked up, so a bad path is
    /// reported even for an unknown id.
    pub async fn set_traces_path(&self, id: &str, path: &str) -> Result<Probe> {
        validation::validate_traces_path(path)?;

        let _guard = self.write_lock.lock().await;

        let mut probe = self.store.require(id).await?;
        probe.traces_path = path.to_string();
        self.write_back(&mut probe).await?;
        info!("Probe {} now writes traces to {}", id, path);
        Ok(probe)
    }

    /// Remove a probe, returning the record as it was
    pub async fn delete(&self, id: &str) -> Result<Probe> {
        let _guard = self.write_lock.lock().await;

        let probe = self.store.require(id).await?;
        self.store
            .remove(id)
            .await
            .inspect_err(|e| error!("Failed to delete probe {}: {}", id, e))?;
        info!("Deleted probe {}", id);
        Ok(probe)
    }

    /// Persist anything the store buffers
    pub async fn flush(&self) -> Result<()> {
        self.store.flush().await.inspect_err(log_internal)
    }

    async fn write_back(&self, probe: &mut Probe) -> Result<()> {
        probe.touch();
        self.store
            .update(probe)
            .await
            .inspect_err(|e| error!("Failed to update probe {}: {}", probe.id, e))
    }
}

fn log_internal(err: &Error) {
    if err.is_internal() {
        error!("Registry operation failed: {}", err);
    }
}
