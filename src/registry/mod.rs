//! Named breaker registry.
//!
//! # Responsibilities
//! - Hand out `Circuit` handles by name, creating records on first use
//! - Reconfigure existing records without resetting their counters
//! - Answer up/down queries by name
//!
//! # Design Decisions
//! - No process-wide singleton; the store is injected
//! - Queries on unknown names report "up" and never create a record

use std::future::Future;
use std::sync::Arc;

use crate::config::FuseboxConfig;
use crate::resilience::{Circuit, CircuitError};
use crate::store::{FuseSettings, FuseStore, FuseUpdate, MemoryStore, StoreError};

/// Factory for named circuits over one store.
#[derive(Debug, Clone)]
pub struct Breakers {
    store: Arc<dyn FuseStore>,
    defaults: FuseSettings,
}

impl Breakers {
    pub fn new(store: Arc<dyn FuseStore>) -> Self {
        Self {
            store,
            defaults: FuseSettings::default(),
        }
    }

    /// Registry over a fresh, unpersisted `MemoryStore`.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Settings used for records created on demand.
    pub fn with_defaults(mut self, defaults: FuseSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn store(&self) -> &Arc<dyn FuseStore> {
        &self.store
    }

    pub fn defaults(&self) -> FuseSettings {
        self.defaults
    }

    /// Circuit for `name`, created with the defaults if it does not exist.
    pub fn circuit(&self, name: &str) -> Result<Circuit, StoreError> {
        self.circuit_with(name, &FuseUpdate::default())
    }

    /// Circuit for `name` with the given configuration fields written.
    pub fn circuit_with(&self, name: &str, update: &FuseUpdate) -> Result<Circuit, StoreError> {
        self.store.upsert(name, update, &self.defaults)?;
        Ok(Circuit::bind(self.store.clone(), name.to_string()))
    }

    /// Run `operation` through the circuit named `name`.
    pub async fn run<F, Fut, T, E>(&self, name: &str, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.circuit(name)?.run(operation).await
    }

    pub fn is_open(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(name)?.map(|fuse| fuse.is_open()).unwrap_or(false))
    }

    pub fn is_closed(&self, name: &str) -> Result<bool, StoreError> {
        Ok(!self.is_open(name)?)
    }

    /// Alias of [`is_closed`](Self::is_closed).
    pub fn is_up(&self, name: &str) -> Result<bool, StoreError> {
        self.is_closed(name)
    }

    /// Alias of [`is_open`](Self::is_open).
    pub fn is_down(&self, name: &str) -> Result<bool, StoreError> {
        self.is_open(name)
    }

    /// Upsert every breaker listed in `config`. Returns how many were applied.
    pub fn apply_config(&self, config: &FuseboxConfig) -> Result<usize, StoreError> {
        for breaker in &config.breakers {
            self.store.upsert(&breaker.name, &breaker.update(), &self.defaults)?;
            tracing::debug!(breaker = %breaker.name, "Applied breaker configuration");
        }
        Ok(config.breakers.len())
    }
}

impl Default for Breakers {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerConfig;
    use std::time::Duration;

    #[test]
    fn test_circuit_uses_registry_defaults() {
        let breakers = Breakers::in_memory().with_defaults(FuseSettings::default().with_failure_threshold(3));
        let fuse = breakers.circuit("api").unwrap().fuse().unwrap();
        assert_eq!(fuse.failure_threshold, 3);
        assert_eq!(fuse.retry_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_name_is_up_and_not_created() {
        let breakers = Breakers::default();
        assert!(breakers.is_up("nobody").unwrap());
        assert!(!breakers.is_down("nobody").unwrap());
        assert!(breakers.store().is_empty().unwrap());
    }

    #[test]
    fn test_apply_config_keeps_state() {
        let breakers = Breakers::in_memory();
        breakers.circuit("payments").unwrap().open().unwrap();

        let mut config = FuseboxConfig::default();
        config.breakers.push(BreakerConfig {
            name: "payments".into(),
            failure_threshold: Some(2),
            retry_timeout_secs: None,
            call_timeout_ms: Some(750),
        });
        config.breakers.push(BreakerConfig {
            name: "search".into(),
            failure_threshold: None,
            retry_timeout_secs: Some(5),
            call_timeout_ms: None,
        });

        assert_eq!(breakers.apply_config(&config).unwrap(), 2);

        let payments = breakers.store().get("payments").unwrap().unwrap();
        assert!(payments.is_open());
        assert_eq!(payments.failure_threshold, 2);
        assert_eq!(payments.call_timeout, Duration::from_millis(750));

        let search = breakers.store().get("search").unwrap().unwrap();
        assert_eq!(search.failure_threshold, 10);
        assert_eq!(search.retry_timeout, Duration::from_secs(5));
    }
}
