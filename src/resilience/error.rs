//! Errors surfaced by guarded calls.

use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

/// Error returned by [`Circuit::run`](crate::resilience::Circuit::run).
///
/// Exactly one of these reaches the caller per call. The operation's own
/// error is carried unchanged in `Inner`.
#[derive(Debug, Error)]
pub enum CircuitError<E> {
    /// The breaker is open and no probe is due; the operation was not invoked.
    #[error("circuit '{name}' is open")]
    Open { name: String },

    /// The operation did not finish within the call timeout.
    #[error("circuit '{name}' call timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// The operation itself failed.
    #[error(transparent)]
    Inner(E),

    /// The breaker record could not be read before the call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<E> CircuitError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitError::Open { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CircuitError::Timeout { .. })
    }

    /// The operation's error, if that is what this is.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitError::Inner(e) => Some(e),
            _ => None,
        }
    }

    /// Name of the breaker that produced the error, when synthesized by it.
    pub fn breaker(&self) -> Option<&str> {
        match self {
            CircuitError::Open { name } | CircuitError::Timeout { name, .. } => Some(name),
            _ => None,
        }
    }
}
