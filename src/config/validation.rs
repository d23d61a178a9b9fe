//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: FuseboxConfig → Result<(), Vec<ValidationError>>
//! - A zero retry timeout is allowed (probe immediately after tripping)
//! - Retry timeouts are capped at one year

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::FuseboxConfig;

/// Longest accepted cooldown, in seconds.
pub const MAX_RETRY_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: failure_threshold must be at least 1")]
    ZeroFailureThreshold { scope: String },

    #[error("{scope}: call_timeout_ms must be greater than 0")]
    ZeroCallTimeout { scope: String },

    #[error("{scope}: retry_timeout_secs must be at most {max}, got {secs}", max = MAX_RETRY_TIMEOUT_SECS)]
    RetryTimeoutTooLong { scope: String, secs: u64 },

    #[error("breaker #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("breaker '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("store.path must not be empty")]
    EmptyStorePath,
}

pub fn validate_config(config: &FuseboxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.defaults.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold { scope: "defaults".into() });
    }
    if config.defaults.call_timeout_ms == 0 {
        errors.push(ValidationError::ZeroCallTimeout { scope: "defaults".into() });
    }
    if config.defaults.retry_timeout_secs > MAX_RETRY_TIMEOUT_SECS {
        errors.push(ValidationError::RetryTimeoutTooLong {
            scope: "defaults".into(),
            secs: config.defaults.retry_timeout_secs,
        });
    }
    if config.store.path.trim().is_empty() {
        errors.push(ValidationError::EmptyStorePath);
    }

    let mut seen = HashSet::new();
    for (index, breaker) in config.breakers.iter().enumerate() {
        if breaker.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName { index });
            continue;
        }
        if !seen.insert(breaker.name.as_str()) {
            errors.push(ValidationError::DuplicateName(breaker.name.clone()));
        }
        let scope = format!("breaker '{}'", breaker.name);
        if breaker.failure_threshold == Some(0) {
            errors.push(ValidationError::ZeroFailureThreshold { scope: scope.clone() });
        }
        if breaker.call_timeout_ms == Some(0) {
            errors.push(ValidationError::ZeroCallTimeout { scope: scope.clone() });
        }
        if let Some(secs) = breaker.retry_timeout_secs.filter(|&s| s > MAX_RETRY_TIMEOUT_SECS) {
            errors.push(ValidationError::RetryTimeoutTooLong { scope, secs });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
