// # sinker-core
//
// Core library for the Sinker probe registry.
//
// ## Architecture Overview
//
// This library keeps the inventory of network probes and their lifecycle:
// - **ProbeStore**: Trait for probe persistence (memory, file, custom)
// - **GeoLookup**: Trait for resolving an IPv4 address to a location
// - **LifecycleManager**: Orchestrates register, lookup, enable/disable,
//   credential rotation, traces path changes and delete
// - **BackendRegistry**: Plugin-based registry for stores and geo lookups
//
// ## Design Principles
//
// 1. **Content-Derived Identity**: A probe's id is a digest of its
//    registration content, fixed at insert time
// 2. **Two-Phase Validation**: The same checks run before and after
//    geolocation enrichment
// 3. **Best-Effort Enrichment**: Geo failures never fail a registration
// 4. **Plugin-Based**: Backends are registered by name, no hard-coded if-else
// 5. **Library-First**: The daemon is a thin shell over this crate

pub mod traits;
pub mod probe;
pub mod identity;
pub mod validation;
pub mod geo;
pub mod store;
pub mod backends;
pub mod lifecycle;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{GeoLocation, GeoLookup, ProbeStore};
pub use probe::{Credentials, NewProbe, Probe, ProbeFilter, Provider};
pub use lifecycle::LifecycleManager;
pub use backends::BackendRegistry;
pub use config::{GeoConfig, ProbeDefaults, RegistryConfig, StoreConfig};
pub use error::{Error, Result};
pub use store::{FileProbeStore, MemoryProbeStore, ProbeStoreAdapter};
pub use geo::{FileGeoDatabase, GeoEnricher, NoGeoLookup};
