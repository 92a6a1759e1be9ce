//! The record store and its configuration

mod documents;

pub use documents::DocumentStore;

/// Storage key the record collection lives under by default
pub const DOCUMENTS_KEY: &str = "@documents";

/// Configuration for a [`DocumentStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Key the collection is persisted under
    pub storage_key: String,
}

impl StoreConfig {
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            storage_key: storage_key.into(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DOCUMENTS_KEY)
    }
}
