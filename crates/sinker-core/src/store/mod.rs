// # Probe Store Implementations
//
// Implementations of the ProbeStore trait for different persistence
// strategies, plus the adapter the lifecycle manager talks to.

pub mod adapter;
pub mod file;
pub mod memory;

pub use adapter::ProbeStoreAdapter;
pub use file::{FileProbeStore, FileProbeStoreFactory};
pub use memory::{MemoryProbeStore, MemoryProbeStoreFactory};
