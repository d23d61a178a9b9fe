//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Circuit transitions and guarded calls produce:
//!     → tracing events (trip, probe, close, rejection)
//!     → metrics.rs (counters, open gauge)
//!
//! The binary wires:
//!     → logging.rs (subscriber with env filter)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and recorders is left
//!   to the application
//! - Metric labels are the breaker name plus one small enum value

pub mod logging;
pub mod metrics;
