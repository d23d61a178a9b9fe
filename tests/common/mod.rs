//! Shared helpers for breaker integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fusebox::{Circuit, FuseSettings, FuseStore, MemoryStore};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("dummy failure")]
pub struct DummyError;

/// Fixed reference time plus `secs`.
#[allow(dead_code)]
pub fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
}

/// Circuit over a fresh store with the given threshold and cooldown.
#[allow(dead_code)]
pub fn circuit(threshold: u32, retry_secs: u64) -> Circuit {
    let store: Arc<dyn FuseStore> = Arc::new(MemoryStore::new());
    let settings = FuseSettings::default()
        .with_failure_threshold(threshold)
        .with_retry_timeout(Duration::from_secs(retry_secs));
    Circuit::new(store, "test", settings).unwrap()
}

/// Counts how often an operation was actually invoked.
#[derive(Debug, Clone, Default)]
pub struct Invocations(Arc<AtomicU32>);

#[allow(dead_code)]
impl Invocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// An operation that records its invocation and fails.
    pub async fn fail(&self) -> Result<(), DummyError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Err(DummyError)
    }

    /// An operation that records its invocation and succeeds.
    pub async fn succeed(&self) -> Result<&'static str, DummyError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok("ok")
    }
}
