//! Scanner: analysis engine → normalizer → record store
//!
//! The scanner is the write path from an image to a stored record, and the
//! edit path from user corrections back into the store. It owns no records
//! itself; it drives the engine, normalizer, reconciler and store in order.
//!
//! Only the newest analysis started on a scanner may produce a result. A
//! retry supersedes the attempt before it, whose result is then discarded
//! with [`ScanError::Superseded`].

mod cancel;

pub use cancel::CancellationToken;

use crate::engine::{AnalysisEngine, EncodedImage, EngineError};
use crate::normalize::{normalize_text, parse_payload, NormalizeError};
use crate::record::{DocumentBody, DocumentRecord, RecordId, RecordPatch};
use crate::reconcile::{reconcile, FieldEdit};
use crate::storage::StorageError;
use crate::store::DocumentStore;
use cancel::AttemptSlot;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from scanner operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Analysis(#[from] EngineError),

    #[error(transparent)]
    Malformed(#[from] NormalizeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Analysis superseded by a newer attempt")]
    Superseded,
}

pub type ScanResult<T> = Result<T, ScanError>;

/// Drives analysis, saving and editing of records
pub struct Scanner {
    engine: Arc<dyn AnalysisEngine>,
    store: Arc<DocumentStore>,
    attempts: AttemptSlot,
}

impl Scanner {
    pub fn new(engine: Arc<dyn AnalysisEngine>, store: Arc<DocumentStore>) -> Self {
        Self {
            engine,
            store,
            attempts: AttemptSlot::default(),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Analyze an image and normalize the result, without saving it
    ///
    /// This is the preview step: the caller reviews (and maybe edits) the
    /// body before handing it to [`Scanner::save`].
    pub async fn analyze(&self, image: &EncodedImage) -> ScanResult<DocumentBody> {
        let token = self.attempts.begin();
        let outcome = self.engine.analyze(image).await;

        if token.is_cancelled() {
            debug!("dropping result of superseded analysis");
            return Err(ScanError::Superseded);
        }
        self.attempts.finish(&token);

        let response = outcome?;
        let body = normalize_text(&response, Utc::now(), self.engine.model())?;
        debug!(
            document_type = %body.document_type,
            confidence = body.confidence,
            "analysis normalized"
        );
        Ok(body)
    }

    /// Abandon the in-flight analysis, if any
    pub fn cancel_analysis(&self) -> bool {
        self.attempts.cancel()
    }

    /// Store a reviewed body as a new record
    pub async fn save(&self, body: DocumentBody) -> ScanResult<DocumentRecord> {
        Ok(self.store.create(body).await?)
    }

    /// Analyze an image and store the result
    pub async fn scan(&self, image: &EncodedImage, image_uri: &str) -> ScanResult<DocumentRecord> {
        let body = self.analyze(image).await?.with_image_uri(image_uri);
        self.save(body).await
    }

    /// Analyze a new image for an existing record and replace its analysis
    pub async fn reanalyze(
        &self,
        id: &RecordId,
        image: &EncodedImage,
        image_uri: Option<&str>,
    ) -> ScanResult<DocumentRecord> {
        if self.store.get_by_id(id).await?.is_none() {
            return Err(ScanError::NotFound(id.clone()));
        }

        let mut body = self.analyze(image).await?;
        body.image_uri = image_uri.map(str::to_string);

        let record = self
            .store
            .replace_analysis(id, body)
            .await?
            .ok_or_else(|| ScanError::NotFound(id.clone()))?;
        info!(%id, document_type = %record.document_type, "record re-analyzed");
        Ok(record)
    }

    /// Apply user edits to a record's data
    pub async fn edit(&self, id: &RecordId, edits: &[FieldEdit]) -> ScanResult<DocumentRecord> {
        self.store
            .modify(id, |record| {
                RecordPatch::data(reconcile(record.document_type, &record.data, edits))
            })
            .await?
            .ok_or_else(|| ScanError::NotFound(id.clone()))
    }

    /// Have the engine revise a record's data from free-text corrections
    ///
    /// The engine's answer is applied as edits, so it is held to the same
    /// rules as a user's: shapes are kept and nothing nested is invented.
    pub async fn enhance(&self, id: &RecordId, corrections: &str) -> ScanResult<DocumentRecord> {
        let record = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ScanError::NotFound(id.clone()))?;

        let current = Value::from(record.data.clone());
        let response = self.engine.enhance(&current, corrections).await?;
        let mut revised = parse_payload(&response)?;

        // Engines sometimes answer with the whole payload instead of `data`
        if let Some(Value::Object(data)) = revised.remove("data") {
            revised = data;
        }

        let edits: Vec<FieldEdit> = revised
            .into_iter()
            .filter(|(field, value)| record.data.get(field) != Some(value))
            .map(|(field, value)| FieldEdit { field, value })
            .collect();

        self.edit(id, &edits).await
    }
}
