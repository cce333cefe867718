//! In-memory store.

use dashmap::DashMap;
use std::sync::Arc;

use crate::storage::{KeyValueStore, StorageError};

/// Thread-safe in-memory key/value store.
///
/// Clones share the same map, which lets a test hand one handle to the
/// wallet and keep another to simulate a process restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear();
        Ok(())
    }
}
