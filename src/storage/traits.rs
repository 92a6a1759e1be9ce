//! Storage trait definitions

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Store is closed")]
    Closed,

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Corrupt collection under {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key/value medium for whole collections
///
/// Each key holds one serialized collection. `write` must replace the value
/// atomically: a reader sees either the old value or the new one.
///
/// Implementations must be thread-safe (Send + Sync); calls may arrive from
/// blocking worker threads.
pub trait CollectionStore: Send + Sync {
    /// Read the value under `key`, `None` if nothing was ever written
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key`
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove the value under `key`, returning whether one existed
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Push buffered writes to durable storage
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Extension trait for opening stores from paths
pub trait OpenStore: CollectionStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
