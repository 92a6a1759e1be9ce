//! Shared helpers for docscan integration tests

#![allow(dead_code)]

use docscan::{
    normalize, DocumentBody, DocumentStore, MockEngine, OpenStore, Scanner, SqliteStore,
};
use chrono::Utc;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// A store over an in-memory SQLite backend
pub fn memory_store() -> Arc<DocumentStore> {
    Arc::new(DocumentStore::new(Arc::new(
        SqliteStore::open_in_memory().expect("in-memory sqlite"),
    )))
}

/// A store over a SQLite file at `path`
pub fn file_store(path: &Path) -> DocumentStore {
    DocumentStore::new(Arc::new(SqliteStore::open(path).expect("sqlite file")))
}

/// Normalize a raw payload the way a fresh analysis would
pub fn body_from(payload: Value) -> DocumentBody {
    normalize(payload, Utc::now(), "gpt-4o").expect("payload normalizes")
}

pub fn scanner(engine: MockEngine, store: Arc<DocumentStore>) -> Scanner {
    Scanner::new(Arc::new(engine), store)
}

pub fn receipt_payload() -> Value {
    serde_json::json!({
        "documentType": "receipt",
        "confidence": 0.93,
        "languages": ["English"],
        "data": {
            "type": "RECEIPT",
            "merchantName": "Old Name",
            "date": "2024-03-01",
            "items": [
                {"name": "Coffee", "quantity": 2, "price": 4.25},
                {"name": "Bagel", "quantity": 1, "price": 34.0}
            ],
            "total": 42.50
        },
        "rawText": "OLD NAME\nCoffee x2 8.50\nBagel 34.00\nTOTAL 42.50",
        "additionalInfo": "Paid by card"
    })
}
