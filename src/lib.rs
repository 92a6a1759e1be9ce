//! docscan: document schemas and a local record store for scanned documents
//!
//! An external analysis engine reads a document image and returns a JSON
//! description of it. docscan turns that description into a well-formed
//! record, keeps user edits from clobbering what the engine extracted, and
//! stores the resulting records in a searchable local collection.
//!
//! # Core Concepts
//!
//! - **Schema registry**: the closed set of document types and the fields
//!   each one carries
//! - **Normalization**: coercing an engine payload into that shape
//! - **Reconciliation**: merging field edits into a record's data
//! - **Record store**: the persisted collection, mutated one
//!   read-modify-write cycle at a time
//!
//! # Example
//!
//! ```
//! use docscan::{normalize, DocumentType};
//! use chrono::Utc;
//! use serde_json::json;
//!
//! let body = normalize(
//!     json!({"documentType": "receipt", "confidence": 1.4, "data": {"total": 12.5}}),
//!     Utc::now(),
//!     "gpt-4o",
//! )
//! .unwrap();
//! assert_eq!(body.document_type, DocumentType::Receipt);
//! assert_eq!(body.confidence, 1.0);
//! assert!(body.data.contains("merchantName"));
//! ```

pub mod engine;
pub mod normalize;
mod record;
pub mod reconcile;
pub mod scanner;
pub mod schema;
pub mod storage;
pub mod store;

pub use engine::{AnalysisEngine, EncodedImage, EngineError, MockEngine};
pub use normalize::{normalize, normalize_payload, normalize_text, parse_payload, NormalizeError};
pub use record::{clamp_confidence, DocumentBody, DocumentRecord, RecordId, RecordPatch};
pub use reconcile::{reconcile, reconcile_one, FieldEdit};
pub use scanner::{CancellationToken, ScanError, ScanResult, Scanner};
pub use schema::{
    fields_for, fields_for_tag, DocumentData, DocumentType, FieldDescriptor, FieldKind,
};
pub use storage::{CollectionStore, OpenStore, SqliteStore, StorageError, StorageResult};
pub use store::{DocumentStore, StoreConfig, DOCUMENTS_KEY};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
