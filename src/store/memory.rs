//! In-memory breaker store with optional JSON snapshots.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::store::{Fuse, FuseSettings, FuseStore, FuseUpdate, StoreError};

/// A thread-safe keyed collection of fuses.
///
/// Clones share the same map. Each record sits behind its own shard lock,
/// so transitions on one breaker do not block another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Fuse>>,
    persistence_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that snapshots to `path` on `save_to_file`.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path: Some(path.into()),
        }
    }

    /// Load from a snapshot file if it exists, otherwise start empty.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::with_persistence(path);
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let fuses: BTreeMap<String, Fuse> = serde_json::from_reader(reader)?;
            for (name, fuse) in fuses {
                store.inner.insert(name, fuse);
            }
            tracing::info!(path = %path.display(), count = store.inner.len(), "Loaded breaker state");
        }
        Ok(store)
    }

    /// Write a snapshot of every record. No-op without a persistence path.
    pub fn save_to_file(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.persistence_path {
            let fuses: BTreeMap<String, Fuse> = self
                .inner
                .iter()
                .map(|r| (r.key().clone(), r.value().clone()))
                .collect();

            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &fuses)?;
            tracing::debug!(path = %path.display(), count = fuses.len(), "Saved breaker state");
        }
        Ok(())
    }

    pub fn persistence_path(&self) -> Option<&Path> {
        self.persistence_path.as_deref()
    }
}

impl FuseStore for MemoryStore {
    fn upsert(&self, name: &str, update: &FuseUpdate, defaults: &FuseSettings) -> Result<Fuse, StoreError> {
        let entry = self
            .inner
            .entry(name.to_string())
            .and_modify(|fuse| update.apply_to(fuse))
            .or_insert_with(|| {
                tracing::debug!(breaker = %name, "Creating breaker record");
                Fuse::new(name, update.merge(*defaults))
            });
        Ok(entry.value().clone())
    }

    fn get(&self, name: &str) -> Result<Option<Fuse>, StoreError> {
        Ok(self.inner.get(name).map(|r| r.value().clone()))
    }

    fn modify(&self, name: &str, f: &mut dyn FnMut(&mut Fuse)) -> Result<Fuse, StoreError> {
        let mut entry = self
            .inner
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        f(entry.value_mut());
        Ok(entry.value().clone())
    }

    fn remove(&self, name: &str) -> Result<Option<Fuse>, StoreError> {
        Ok(self.inner.remove(name).map(|(_, fuse)| fuse))
    }

    fn names(&self) -> Result<Vec<String>, StoreError> {
        let mut names: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.inner.len())
    }
}
