//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → FuseboxConfig (validated, immutable)
//!     → Breakers::apply_config (upsert per-breaker settings)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Per-breaker entries are partial; omitted fields never overwrite stored values
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BreakerConfig, DefaultsConfig, FuseboxConfig, ObservabilityConfig, StoreConfig};
pub use validation::{ValidationError, MAX_RETRY_TIMEOUT_SECS};
