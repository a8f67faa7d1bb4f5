//! Durable records and cached artifacts.

pub mod artifacts;
pub mod error;
pub mod records;

pub use artifacts::ArtifactStore;
pub use error::{StoreError, StoreResult};
pub use records::{MemoryStore, RecordStore, StoreStats};
