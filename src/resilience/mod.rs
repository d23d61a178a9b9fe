//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Circuit::run(operation):
//!     → circuit_breaker.rs (read fuse, admit / reject / claim probe)
//!     → timeouts.rs (run operation under call_timeout)
//!     → circuit_breaker.rs (apply outcome to the fuse atomically)
//!     → error.rs (Open / Timeout / Inner surfaced to the caller)
//! ```
//!
//! # Design Decisions
//! - Timeouts are failures; every guarded call has a deadline
//! - The breaker never retries or swallows an error, it only observes
//! - No background tasks; time only advances when a caller passes a clock

pub mod circuit_breaker;
pub mod error;
pub mod timeouts;

pub use circuit_breaker::{Circuit, CircuitStatus};
pub use error::CircuitError;
pub use timeouts::CallOutcome;
