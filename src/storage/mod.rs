//! Storage backends for docscan
//!
//! Collections are persisted through the `CollectionStore` trait.
//! The primary implementation is `SqliteStore` for persistent storage.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{CollectionStore, OpenStore, StorageError, StorageResult};
