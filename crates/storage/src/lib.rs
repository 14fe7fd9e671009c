#![forbid(unsafe_code)]

pub mod keys;
pub mod repository;
pub mod sqlite;
pub mod stores;

pub use repository::{InMemoryStore, KeyValueStore, Storage, StorageError};
pub use stores::{LedgerStore, ProgressStore, ShuffleStore};
