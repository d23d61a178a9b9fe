//! Breaker metrics.
//!
//! # Metrics
//! - `fusebox_calls_total` (counter): guarded calls by breaker, outcome
//!   (`success`, `failure`, `timeout`, `rejected`)
//! - `fusebox_transitions_total` (counter): state changes by breaker, target state
//! - `fusebox_open` (gauge): 1 while the breaker is open, 0 otherwise
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the embedding application installs a recorder.

use crate::store::BreakerState;

pub fn record_call(breaker: &str, outcome: &'static str) {
    metrics::counter!(
        "fusebox_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_transition(breaker: &str, to: BreakerState) {
    let (label, open) = match to {
        BreakerState::Open => ("open", 1.0),
        BreakerState::Closed => ("closed", 0.0),
    };
    metrics::counter!(
        "fusebox_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => label
    )
    .increment(1);
    metrics::gauge!("fusebox_open", "breaker" => breaker.to_string()).set(open);
}
