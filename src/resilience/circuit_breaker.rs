//! Circuit breaker state machine.
//!
//! # States
//! - Closed: calls pass through, failures are counted
//! - Open: calls are rejected without running the operation
//! - Half-Open: derived, not stored; Open and past the retry threshold, so
//!   the next call runs as a probe
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: now >= retry_threshold
//! Half-Open → Closed: probe succeeds (count and threshold cleared)
//! Half-Open → Open: probe fails (retry_threshold = probe time + retry_timeout)
//! ```
//!
//! # Design Decisions
//! - A `Circuit` is a name plus a store handle; all state lives in the store
//! - Every transition is one `FuseStore::modify` call
//! - Timeouts count as failures
//! - A probe is claimed by pushing the retry threshold out before running,
//!   so concurrent callers keep getting rejected while it is in flight

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use crate::observability::metrics;
use crate::resilience::error::CircuitError;
use crate::resilience::timeouts::{call_with_timeout, CallOutcome};
use crate::store::{BreakerState, Fuse, FuseSettings, FuseStore, FuseUpdate, StoreError};

/// Observed breaker status, including the derived half-open condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitStatus {
    /// Derive the status of `fuse` at `now`.
    pub fn of(fuse: &Fuse, now: SystemTime) -> Self {
        match fuse.state {
            BreakerState::Closed => CircuitStatus::Closed,
            BreakerState::Open if fuse.is_probe_due(now) => CircuitStatus::HalfOpen,
            BreakerState::Open => CircuitStatus::Open,
        }
    }
}

impl fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CircuitStatus::Closed => "closed",
            CircuitStatus::Open => "open",
            CircuitStatus::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// How a call got past the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
    Rejected,
}

/// Handle to one named breaker in a store.
///
/// Cheap to clone and safe to recreate per call; handles over the same name
/// share everything through the store.
#[derive(Debug, Clone)]
pub struct Circuit {
    name: String,
    store: Arc<dyn FuseStore>,
}

impl Circuit {
    /// Create (or reconfigure) the named record with `settings` and bind to it.
    pub fn new(store: Arc<dyn FuseStore>, name: impl Into<String>, settings: FuseSettings) -> Result<Self, StoreError> {
        let name = name.into();
        store.upsert(&name, &FuseUpdate::from(settings), &settings)?;
        Ok(Self { name, store })
    }

    /// Bind to a record that must already exist.
    pub fn attach(store: Arc<dyn FuseStore>, name: impl Into<String>) -> Result<Self, StoreError> {
        let name = name.into();
        if store.get(&name)?.is_none() {
            return Err(StoreError::NotFound(name));
        }
        Ok(Self { name, store })
    }

    pub(crate) fn bind(store: Arc<dyn FuseStore>, name: String) -> Self {
        Self { name, store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current snapshot of the record.
    pub fn fuse(&self) -> Result<Fuse, StoreError> {
        self.store
            .get(&self.name)?
            .ok_or_else(|| StoreError::NotFound(self.name.clone()))
    }

    pub fn settings(&self) -> Result<FuseSettings, StoreError> {
        Ok(self.fuse()?.settings())
    }

    /// Stored tag is `Open`. Does not evaluate the probe condition.
    pub fn is_open(&self) -> Result<bool, StoreError> {
        Ok(self.fuse()?.is_open())
    }

    /// Stored tag is `Closed`.
    pub fn is_closed(&self) -> Result<bool, StoreError> {
        Ok(self.fuse()?.is_closed())
    }

    pub fn status(&self) -> Result<CircuitStatus, StoreError> {
        self.status_at(SystemTime::now())
    }

    /// Observed status at `now`, without side effects.
    pub fn status_at(&self, now: SystemTime) -> Result<CircuitStatus, StoreError> {
        Ok(CircuitStatus::of(&self.fuse()?, now))
    }

    /// Write the provided configuration fields. Counters and state are kept.
    pub fn reconfigure(&self, update: &FuseUpdate) -> Result<Fuse, StoreError> {
        let current = self.settings()?;
        self.store.upsert(&self.name, update, &current)
    }

    pub fn open(&self) -> Result<Fuse, StoreError> {
        self.open_at(SystemTime::now())
    }

    /// Trip the breaker by hand; the cooldown starts at `now`.
    pub fn open_at(&self, now: SystemTime) -> Result<Fuse, StoreError> {
        let fuse = self.store.modify(&self.name, &mut |fuse| {
            fuse.failure_count = fuse.failure_count.max(1);
            fuse.trip(now);
        })?;
        tracing::info!(breaker = %self.name, failures = fuse.failure_count, "Circuit opened manually");
        metrics::record_transition(&self.name, BreakerState::Open);
        Ok(fuse)
    }

    /// Reset the breaker by hand.
    pub fn close(&self) -> Result<Fuse, StoreError> {
        let fuse = self.store.modify(&self.name, &mut |fuse| fuse.reset())?;
        tracing::info!(breaker = %self.name, "Circuit closed manually");
        metrics::record_transition(&self.name, BreakerState::Closed);
        Ok(fuse)
    }

    /// Run `operation` under the breaker using the wall clock.
    pub async fn run<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_at(SystemTime::now(), operation).await
    }

    /// Run `operation` under the breaker, evaluating time as `now`.
    ///
    /// # Errors
    ///
    /// - [`CircuitError::Open`] when the breaker rejects the call; the
    ///   operation is not invoked
    /// - [`CircuitError::Timeout`] when the operation exceeds the call timeout
    /// - [`CircuitError::Inner`] with the operation's own error
    /// - [`CircuitError::Store`] when the record cannot be read
    pub async fn run_at<F, Fut, T, E>(&self, now: SystemTime, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (admission, fuse) = self.admit(now)?;
        if admission == Admission::Rejected {
            tracing::debug!(breaker = %self.name, retry_threshold = ?fuse.retry_threshold, "Circuit open, call rejected");
            metrics::record_call(&self.name, "rejected");
            return Err(CircuitError::Open { name: self.name.clone() });
        }

        let call_timeout = fuse.call_timeout;
        let outcome = call_with_timeout(call_timeout, operation).await;
        metrics::record_call(&self.name, outcome.label());

        match outcome {
            CallOutcome::Success(value) => {
                if admission == Admission::Probe {
                    self.record_probe_success();
                }
                Ok(value)
            }
            CallOutcome::Failed(e) => {
                self.record_failure(admission, now);
                Err(CircuitError::Inner(e))
            }
            CallOutcome::TimedOut => {
                tracing::debug!(breaker = %self.name, timeout = ?call_timeout, "Guarded call timed out");
                self.record_failure(admission, now);
                Err(CircuitError::Timeout {
                    name: self.name.clone(),
                    timeout: call_timeout,
                })
            }
        }
    }

    /// Decide whether a call at `now` may run.
    fn admit(&self, now: SystemTime) -> Result<(Admission, Fuse), StoreError> {
        let fuse = self.fuse()?;
        match CircuitStatus::of(&fuse, now) {
            CircuitStatus::Closed => Ok((Admission::Normal, fuse)),
            CircuitStatus::Open => Ok((Admission::Rejected, fuse)),
            CircuitStatus::HalfOpen => {
                // Re-check under the record lock; only one caller wins the probe.
                let mut admission = Admission::Rejected;
                let fuse = self.store.modify(&self.name, &mut |fuse| {
                    admission = match CircuitStatus::of(fuse, now) {
                        CircuitStatus::Closed => Admission::Normal,
                        CircuitStatus::Open => Admission::Rejected,
                        CircuitStatus::HalfOpen => {
                            fuse.trip(now);
                            Admission::Probe
                        }
                    };
                })?;
                if admission == Admission::Probe {
                    tracing::info!(breaker = %self.name, "Circuit half-open, probing");
                }
                Ok((admission, fuse))
            }
        }
    }

    fn record_probe_success(&self) {
        let mut closed = false;
        let result = self.store.modify(&self.name, &mut |fuse| {
            closed = fuse.is_open();
            if closed {
                fuse.reset();
            }
        });
        match result {
            Ok(_) if closed => {
                tracing::info!(breaker = %self.name, "Probe succeeded, circuit closed");
                metrics::record_transition(&self.name, BreakerState::Closed);
            }
            Ok(_) => {}
            Err(e) => tracing::error!(breaker = %self.name, error = %e, "Failed to record probe success"),
        }
    }

    fn record_failure(&self, admission: Admission, now: SystemTime) {
        let mut tripped = false;
        let result = self.store.modify(&self.name, &mut |fuse| {
            fuse.failure_count = fuse.failure_count.saturating_add(1);
            tripped = match (fuse.state, admission) {
                (BreakerState::Closed, _) => {
                    let reached = fuse.failure_count >= fuse.failure_threshold;
                    if reached {
                        fuse.trip(now);
                    }
                    reached
                }
                (BreakerState::Open, Admission::Probe) => {
                    fuse.trip(now);
                    true
                }
                // Already tripped by a concurrent call; count only.
                (BreakerState::Open, _) => false,
            };
        });
        match result {
            Ok(fuse) if tripped => {
                tracing::warn!(
                    breaker = %self.name,
                    failures = fuse.failure_count,
                    threshold = fuse.failure_threshold,
                    probe = admission == Admission::Probe,
                    "Circuit opened"
                );
                metrics::record_transition(&self.name, BreakerState::Open);
            }
            Ok(fuse) => {
                tracing::debug!(breaker = %self.name, failures = fuse.failure_count, "Failure recorded");
            }
            Err(e) => tracing::error!(breaker = %self.name, error = %e, "Failed to record failure"),
        }
    }
}
