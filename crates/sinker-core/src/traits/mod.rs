//! Core traits for the probe registry
//!
//! This module defines the abstract interfaces the registry consumes.
//!
//! - [`ProbeStore`]: Key-addressed record store for probes
//! - [`GeoLookup`]: IPv4 → location lookup

pub mod geo_lookup;
pub mod probe_store;

pub use geo_lookup::{GeoLocation, GeoLookup, GeoLookupFactory};
pub use probe_store::{ProbeStore, ProbeStoreFactory};
