//! Key/value persistence collaborator.
//!
//! # Data Flow
//! ```text
//! VaultStore ──┐                       ┌─→ memory.rs (DashMap, tests/embedding)
//!              ├─→ KeyValueStore trait ┤
//! Ledger ──────┘                       └─→ file.rs (one JSON file on disk)
//! ```
//!
//! Values are opaque strings; callers store JSON documents through
//! [`get_json`] / [`set_json`]. No schema beyond the vault record, the
//! initialized flag and the transaction list is asked of a backend.

pub mod file;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Fixed keys under which the wallet persists its state.
pub mod keys {
    /// Serialized `VaultRecord`.
    pub const VAULT_RECORD: &str = "vault.record";
    /// `true` once a complete vault record has been written.
    pub const VAULT_INITIALIZED: &str = "vault.initialized";
    /// Serialized list of `TransactionRecord`.
    pub const LEDGER_TRANSACTIONS: &str = "ledger.transactions";
}

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Minimal key/value contract the vault and ledger are built on.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON value.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON value.
pub fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    store.set(key, serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        assert!(get_json::<Vec<u32>>(&store, "numbers").unwrap().is_none());

        set_json(&store, "numbers", &vec![1u32, 2, 3]).unwrap();
        let numbers: Vec<u32> = get_json(&store, "numbers").unwrap().unwrap();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let store = MemoryStore::new();
        store.set("numbers", "not json".to_string()).unwrap();
        assert!(matches!(
            get_json::<Vec<u32>>(&store, "numbers"),
            Err(StorageError::Serialization(_))
        ));
    }
}
