use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::stores::{LedgerStore, ProgressStore, ShuffleStore};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// String-keyed, string-valued persistence.
///
/// Missing keys are not errors: `get` returns `Ok(None)` and `delete` is a no-op.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Typed stores sharing one key-value backend, for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: ProgressStore,
    pub shuffles: ShuffleStore,
    pub wrong_answers: LedgerStore,
}

impl Storage {
    #[must_use]
    pub fn from_store(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            progress: ProgressStore::new(Arc::clone(&kv)),
            shuffles: ShuffleStore::new(Arc::clone(&kv)),
            wrong_answers: LedgerStore::new(kv),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_keys_are_not_errors() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("progress:a:b").await.unwrap(), None);
        store.delete("progress:a:b").await.unwrap();
    }

    #[tokio::test]
    async fn set_overwrites_and_delete_is_scoped() {
        let store = InMemoryStore::new();
        store.set("progress:a:1", "x").await.unwrap();
        store.set("progress:a:1", "y").await.unwrap();
        store.set("progress:a:2", "z").await.unwrap();
        store.set("shuffle:a:1", "s").await.unwrap();

        assert_eq!(store.get("progress:a:1").await.unwrap().as_deref(), Some("y"));

        store.delete("progress:a:1").await.unwrap();
        assert_eq!(store.get("progress:a:1").await.unwrap(), None);
        assert_eq!(store.get("progress:a:2").await.unwrap().as_deref(), Some("z"));
        assert_eq!(store.get("shuffle:a:1").await.unwrap().as_deref(), Some("s"));
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.set("k", "v").await.unwrap();
        assert_eq!(other.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
