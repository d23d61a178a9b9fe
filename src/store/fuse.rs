//! Breaker record definitions.
//!
//! A `Fuse` is the persisted state plus configuration of one named breaker.
//! All types derive Serde traits so stores can snapshot them.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Stored state tag. Half-open is never stored; it is derived from `Open`
/// and the retry threshold at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreakerState {
    #[default]
    Closed,
    Open,
}

/// Breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuseSettings {
    /// Failures needed to trip the breaker (trips when the count reaches it).
    pub failure_threshold: u32,

    /// Cooldown before a probe is allowed.
    pub retry_timeout: Duration,

    /// Maximum time a guarded operation may run.
    pub call_timeout: Duration,
}

impl Default for FuseSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 10,
            retry_timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl FuseSettings {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Partial configuration update.
///
/// Only the fields that are `Some` are written; everything else keeps its
/// stored value (or the default, when the record is being created).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuseUpdate {
    pub failure_threshold: Option<u32>,
    pub retry_timeout: Option<Duration>,
    pub call_timeout: Option<Duration>,
}

impl FuseUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn retry_timeout(mut self, timeout: Duration) -> Self {
        self.retry_timeout = Some(timeout);
        self
    }

    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// True when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.failure_threshold.is_none() && self.retry_timeout.is_none() && self.call_timeout.is_none()
    }

    /// Overlay the provided fields on `settings`.
    pub fn merge(&self, settings: FuseSettings) -> FuseSettings {
        FuseSettings {
            failure_threshold: self.failure_threshold.unwrap_or(settings.failure_threshold),
            retry_timeout: self.retry_timeout.unwrap_or(settings.retry_timeout),
            call_timeout: self.call_timeout.unwrap_or(settings.call_timeout),
        }
    }

    /// Write the provided configuration fields into an existing record.
    /// State, counters and the retry threshold are never touched.
    pub fn apply_to(&self, fuse: &mut Fuse) {
        if let Some(threshold) = self.failure_threshold {
            fuse.failure_threshold = threshold;
        }
        if let Some(timeout) = self.retry_timeout {
            fuse.retry_timeout = timeout;
        }
        if let Some(timeout) = self.call_timeout {
            fuse.call_timeout = timeout;
        }
    }
}

impl From<FuseSettings> for FuseUpdate {
    fn from(settings: FuseSettings) -> Self {
        Self {
            failure_threshold: Some(settings.failure_threshold),
            retry_timeout: Some(settings.retry_timeout),
            call_timeout: Some(settings.call_timeout),
        }
    }
}

/// State and configuration of one named breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fuse {
    /// Unique breaker name.
    pub name: String,

    pub state: BreakerState,

    /// Failures counted since the breaker last closed.
    pub failure_count: u32,

    /// Earliest instant a probe may run. Set iff `state` is `Open`.
    pub retry_threshold: Option<SystemTime>,

    pub failure_threshold: u32,
    pub retry_timeout: Duration,
    pub call_timeout: Duration,
}

impl Fuse {
    /// Create a closed record with the given configuration.
    pub fn new(name: impl Into<String>, settings: FuseSettings) -> Self {
        Self {
            name: name.into(),
            state: BreakerState::Closed,
            failure_count: 0,
            retry_threshold: None,
            failure_threshold: settings.failure_threshold,
            retry_timeout: settings.retry_timeout,
            call_timeout: settings.call_timeout,
        }
    }

    pub fn settings(&self) -> FuseSettings {
        FuseSettings {
            failure_threshold: self.failure_threshold,
            retry_timeout: self.retry_timeout,
            call_timeout: self.call_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state == BreakerState::Closed
    }

    /// Open and past the retry threshold at `now`.
    pub fn is_probe_due(&self, now: SystemTime) -> bool {
        match (self.state, self.retry_threshold) {
            (BreakerState::Open, Some(threshold)) => now >= threshold,
            // An open record without a threshold cannot be waited out.
            (BreakerState::Open, None) => true,
            (BreakerState::Closed, _) => false,
        }
    }

    /// Move to `Open` with a fresh cooldown measured from `now`.
    pub(crate) fn trip(&mut self, now: SystemTime) {
        self.state = BreakerState::Open;
        self.retry_threshold = Some(cooldown_end(now, self.retry_timeout));
    }

    /// Move to `Closed` and clear all failure bookkeeping.
    pub(crate) fn reset(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.retry_threshold = None;
    }
}

/// `now + retry_timeout`, saturating at the latest representable instant.
fn cooldown_end(now: SystemTime, retry_timeout: Duration) -> SystemTime {
    if let Some(end) = now.checked_add(retry_timeout) {
        return end;
    }
    let mut end = now;
    let mut step = retry_timeout;
    while !step.is_zero() {
        match end.checked_add(step) {
            Some(later) => end = later,
            None => step /= 2,
        }
    }
    end
}
