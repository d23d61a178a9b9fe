//! Breaker state storage.
//!
//! # Data Flow
//! ```text
//! Circuit (transient handle)
//!     → FuseStore::get      (read snapshot, decide admission)
//!     → FuseStore::modify   (atomic read-decide-write per transition)
//!     → FuseStore::upsert   (create on first use / reconfigure)
//! ```
//!
//! # Design Decisions
//! - The store is the sole owner of every `Fuse`; circuits only hold a name
//! - `modify` is the single mutation path for state transitions and must be
//!   linearizable per record
//! - Upsert writes configuration fields only, never counters or state
//! - `MemoryStore` is the reference implementation; other backends plug in
//!   through the trait

pub mod fuse;
pub mod memory;

use thiserror::Error;

pub use fuse::{BreakerState, Fuse, FuseSettings, FuseUpdate};
pub use memory::MemoryStore;

/// Errors raised by a breaker store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under this name.
    #[error("no breaker named '{0}'")]
    NotFound(String),

    /// Snapshot file could not be read or written.
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file could not be (de)serialized.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Failure reported by an external backend.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Storage for breaker records.
///
/// Implementations must make `modify` atomic for a single name so that
/// concurrent transitions never lose a failure or apply a trip twice.
/// Operations on different names should not contend.
pub trait FuseStore: Send + Sync + std::fmt::Debug {
    /// Get or create the record for `name`.
    ///
    /// A new record takes `defaults` overlaid with `update`. An existing record
    /// only receives the fields present in `update`.
    fn upsert(&self, name: &str, update: &FuseUpdate, defaults: &FuseSettings) -> Result<Fuse, StoreError>;

    /// Current snapshot of the record, if any.
    fn get(&self, name: &str) -> Result<Option<Fuse>, StoreError>;

    /// Atomically mutate the record and return the result.
    fn modify(&self, name: &str, f: &mut dyn FnMut(&mut Fuse)) -> Result<Fuse, StoreError>;

    /// Remove the record. Only store owners call this; circuits never do.
    fn remove(&self, name: &str) -> Result<Option<Fuse>, StoreError>;

    /// Names of all stored records, sorted.
    fn names(&self) -> Result<Vec<String>, StoreError>;

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.names()?.len())
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
