//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::store::{FuseSettings, FuseUpdate};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FuseboxConfig {
    /// Settings for breakers created on demand.
    pub defaults: DefaultsConfig,

    /// State persistence.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Per-breaker overrides, applied by upsert.
    pub breakers: Vec<BreakerConfig>,
}

impl FuseboxConfig {
    pub fn breaker(&self, name: &str) -> Option<&BreakerConfig> {
        self.breakers.iter().find(|b| b.name == name)
    }
}

/// Default breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Failures that trip a breaker.
    pub failure_threshold: u32,

    /// Cooldown before a probe, in seconds.
    pub retry_timeout_secs: u64,

    /// Guarded call deadline, in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let settings = FuseSettings::default();
        Self {
            failure_threshold: settings.failure_threshold,
            retry_timeout_secs: settings.retry_timeout.as_secs(),
            call_timeout_ms: settings.call_timeout.as_millis() as u64,
        }
    }
}

impl DefaultsConfig {
    pub fn settings(&self) -> FuseSettings {
        FuseSettings {
            failure_threshold: self.failure_threshold,
            retry_timeout: Duration::from_secs(self.retry_timeout_secs),
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }
}

/// Configuration of one named breaker. Omitted fields are left alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// Breaker name (unique).
    pub name: String,

    #[serde(default)]
    pub failure_threshold: Option<u32>,

    #[serde(default)]
    pub retry_timeout_secs: Option<u64>,

    #[serde(default)]
    pub call_timeout_ms: Option<u64>,
}

impl BreakerConfig {
    pub fn update(&self) -> FuseUpdate {
        FuseUpdate {
            failure_threshold: self.failure_threshold,
            retry_timeout: self.retry_timeout_secs.map(Duration::from_secs),
            call_timeout: self.call_timeout_ms.map(Duration::from_millis),
        }
    }
}

/// State persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot file holding every breaker record.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "fusebox-state.json".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Single-line log output.
    pub compact: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            compact: false,
        }
    }
}
