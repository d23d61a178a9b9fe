//! Circuit breaker with pluggable, persistent state.
//!
//! ```text
//! caller ──run()──▶ Circuit ──get/modify──▶ FuseStore ──▶ MemoryStore (+ JSON snapshot)
//!                     │
//!                     └── operation under call_timeout
//! ```

pub mod config;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod store;

pub use config::FuseboxConfig;
pub use registry::Breakers;
pub use resilience::{Circuit, CircuitError, CircuitStatus};
pub use store::{BreakerState, Fuse, FuseSettings, FuseStore, FuseUpdate, MemoryStore, StoreError};
