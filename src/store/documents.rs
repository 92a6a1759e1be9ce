//! DocumentStore: the authoritative record collection

use super::StoreConfig;
use crate::record::{DocumentBody, DocumentRecord, RecordId, RecordPatch};
use crate::storage::{CollectionStore, StorageError, StorageResult};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Owns the persisted collection of [`DocumentRecord`]s
///
/// The whole collection is the unit of persistence: each mutation reads it,
/// changes it in memory and writes it back. Mutations hold the write half of
/// an internal lock for that entire cycle, so they are applied one at a time
/// in a total order and none is lost. Reads hold the read half and always
/// see a fully written collection.
///
/// Backend calls run on the blocking pool.
pub struct DocumentStore {
    backend: Arc<dyn CollectionStore>,
    key: String,
    lock: RwLock<()>,
    closed: AtomicBool,
}

impl DocumentStore {
    /// Create a store over `backend` with the default configuration
    pub fn new(backend: Arc<dyn CollectionStore>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn CollectionStore>, config: StoreConfig) -> Self {
        Self {
            backend,
            key: config.storage_key,
            lock: RwLock::new(()),
            closed: AtomicBool::new(false),
        }
    }

    /// The key the collection is persisted under
    pub fn storage_key(&self) -> &str {
        &self.key
    }

    // === Persistence ===

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    async fn read_raw(&self) -> StorageResult<Option<String>> {
        let backend = self.backend.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || backend.read(&key))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    async fn load(&self) -> StorageResult<Vec<DocumentRecord>> {
        match self.read_raw().await? {
            None => Ok(Vec::new()),
            Some(text) => serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                key: self.key.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn persist(&self, records: &[DocumentRecord]) -> StorageResult<()> {
        let text = serde_json::to_string(records)?;
        let backend = self.backend.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || backend.write(&key, &text))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }

    /// Run one read-modify-write cycle under the write lock
    ///
    /// `f` returns its output and whether the collection changed; unchanged
    /// collections are not written back.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<DocumentRecord>) -> (T, bool),
    ) -> StorageResult<T> {
        let _guard = self.lock.write().await;
        self.ensure_open()?;

        let mut records = self.load().await?;
        let (output, changed) = f(&mut records);
        if changed {
            self.persist(&records).await?;
            debug!(key = %self.key, count = records.len(), "collection written");
        }
        Ok(output)
    }

    async fn snapshot(&self) -> StorageResult<Vec<DocumentRecord>> {
        let _guard = self.lock.read().await;
        self.ensure_open()?;
        self.load().await
    }

    // === Mutations ===

    /// Store a new record built from `body`
    ///
    /// Assigns a fresh id and sets `created_at == updated_at == now`.
    pub async fn create(&self, body: DocumentBody) -> StorageResult<DocumentRecord> {
        let record = self
            .mutate(|records| {
                let mut id = RecordId::new();
                while records.iter().any(|r| r.id == id) {
                    id = RecordId::new();
                }
                let record = DocumentRecord::from_body(id, body, Utc::now());
                records.push(record.clone());
                (record, true)
            })
            .await?;

        info!(id = %record.id, document_type = %record.document_type, "record created");
        Ok(record)
    }

    /// Merge `patch` into the record with `id`
    ///
    /// Returns `None` when no such record exists. `updated_at` always
    /// advances; `id` and `created_at` never change.
    pub async fn update(
        &self,
        id: &RecordId,
        patch: RecordPatch,
    ) -> StorageResult<Option<DocumentRecord>> {
        self.mutate(|records| match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.apply(patch, Utc::now());
                (Some(record.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    /// Derive a patch from the current record and apply it in one cycle
    ///
    /// `f` sees the record as stored at the moment the write lock is held,
    /// so edits computed from it cannot race another mutation.
    pub async fn modify(
        &self,
        id: &RecordId,
        f: impl FnOnce(&DocumentRecord) -> RecordPatch,
    ) -> StorageResult<Option<DocumentRecord>> {
        self.mutate(|records| match records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                let patch = f(record);
                record.apply(patch, Utc::now());
                (Some(record.clone()), true)
            }
            None => (None, false),
        })
        .await
    }

    /// Replace every analysis-derived field, as after re-analysis
    pub async fn replace_analysis(
        &self,
        id: &RecordId,
        body: DocumentBody,
    ) -> StorageResult<Option<DocumentRecord>> {
        self.update(id, RecordPatch::from(body)).await
    }

    /// Remove the record with `id`, returning whether one was removed
    pub async fn delete(&self, id: &RecordId) -> StorageResult<bool> {
        let removed = self
            .mutate(|records| {
                let before = records.len();
                records.retain(|r| &r.id != id);
                let removed = records.len() != before;
                (removed, removed)
            })
            .await?;

        if removed {
            info!(%id, "record deleted");
        }
        Ok(removed)
    }

    /// Drop the whole persisted collection, returning how many records it held
    ///
    /// The stored value is not decoded as records, so a corrupt collection
    /// can still be cleared; its count is reported as 0.
    pub async fn clear(&self) -> StorageResult<usize> {
        let _guard = self.lock.write().await;
        self.ensure_open()?;

        let count = match self.read_raw().await? {
            None => 0,
            Some(text) => match serde_json::from_str::<Vec<serde_json::Value>>(&text) {
                Ok(entries) => entries.len(),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "clearing unreadable collection");
                    0
                }
            },
        };
        let backend = self.backend.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || backend.remove(&key))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        info!(key = %self.key, count, "collection cleared");
        Ok(count)
    }

    // === Reads ===

    /// All records in insertion order
    pub async fn get_all(&self) -> StorageResult<Vec<DocumentRecord>> {
        self.snapshot().await
    }

    pub async fn get_by_id(&self, id: &RecordId) -> StorageResult<Option<DocumentRecord>> {
        Ok(self.snapshot().await?.into_iter().find(|r| &r.id == id))
    }

    pub async fn count(&self) -> StorageResult<usize> {
        Ok(self.snapshot().await?.len())
    }

    /// Records whose serialized form contains `query`, ignoring case
    ///
    /// Matches anywhere in the record, nested fields and key names included.
    /// An empty query matches everything.
    pub async fn search(&self, query: &str) -> StorageResult<Vec<DocumentRecord>> {
        let records = self.snapshot().await?;
        if query.is_empty() {
            return Ok(records);
        }

        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for record in records {
            let haystack = serde_json::to_string(&record)?.to_lowercase();
            if haystack.contains(&needle) {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    /// Records whose type tag contains `tag`, ignoring case
    ///
    /// `"All"` or an empty tag matches everything. Matching is by substring,
    /// so `"id"` also selects `id_card` records.
    pub async fn filter_by_type(&self, tag: &str) -> StorageResult<Vec<DocumentRecord>> {
        let records = self.snapshot().await?;
        let tag = tag.trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case("all") {
            return Ok(records);
        }

        let needle = tag.to_lowercase();
        Ok(records
            .into_iter()
            .filter(|r| r.document_type.as_tag().contains(&needle))
            .collect())
    }

    // === Lifecycle ===

    /// Wait for in-flight mutations, flush the backend and refuse further calls
    pub async fn close(&self) -> StorageResult<()> {
        let _guard = self.lock.write().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let backend = self.backend.clone();
        tokio::task::spawn_blocking(move || backend.flush())
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        info!(key = %self.key, "store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
