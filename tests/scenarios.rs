//! End-to-end scenarios: normalize → store → edit → search, over SQLite
//!
//! Run with: `cargo test --test scenarios`

mod common;

use common::{body_from, file_store, memory_store, receipt_payload, scanner};
use docscan::{
    fields_for, DocumentType, EncodedImage, FieldEdit, MockEngine, RecordId, ScanError,
    StorageError,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn receipt_is_stored_with_its_items_and_total() {
    let store = memory_store();
    let record = store.create(body_from(receipt_payload())).await.unwrap();

    let fetched = store.get_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(fetched.document_type, DocumentType::Receipt);
    assert_eq!(fetched.data.type_label(), Some("RECEIPT"));

    let items = fetched.data.get("items").unwrap().as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], json!("Coffee"));
    assert_eq!(fetched.data.get("total"), Some(&json!(42.5)));

    for field in fields_for(DocumentType::Receipt) {
        assert!(fetched.data.contains(field.name), "missing {}", field.name);
    }
    assert_eq!(fetched.created_at, fetched.updated_at);
}

#[tokio::test]
async fn editing_merchant_name_keeps_items_and_advances_timestamp() {
    let store = memory_store();
    let scanner = scanner(MockEngine::new("gpt-4o"), store.clone());
    let original = store.create(body_from(receipt_payload())).await.unwrap();

    let edited = scanner
        .edit(&original.id, &[FieldEdit::text("merchantName", "New Name")])
        .await
        .unwrap();

    assert_eq!(edited.data.get("merchantName"), Some(&json!("New Name")));
    assert_eq!(edited.data.get("items"), original.data.get("items"));
    assert_eq!(edited.data.get("total"), original.data.get("total"));
    assert_eq!(edited.created_at, original.created_at);
    assert!(edited.updated_at > original.updated_at);
    assert_eq!(edited.raw_text, original.raw_text);
    assert_eq!(edited.confidence, original.confidence);
}

#[tokio::test]
async fn unknown_type_is_stored_as_generic_document() {
    let store = memory_store();
    let record = store
        .create(body_from(json!({
            "documentType": "foo",
            "confidence": 0.4,
            "data": {"title": "Lease agreement"}
        })))
        .await
        .unwrap();

    assert_eq!(record.document_type, DocumentType::Generic);
    assert_eq!(record.data.type_label(), Some("DOCUMENT"));
    assert_eq!(record.data.get("title"), Some(&json!("Lease agreement")));
    assert_eq!(store.filter_by_type("generic").await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_deletes_remove_exactly_once() {
    let store = memory_store();
    let keep = store.create(body_from(receipt_payload())).await.unwrap();
    let target = store.create(body_from(receipt_payload())).await.unwrap();

    let (a, b) = tokio::join!(store.delete(&target.id), store.delete(&target.id));
    let removed = [a.unwrap(), b.unwrap()];
    assert_eq!(removed.iter().filter(|r| **r).count(), 1);

    let remaining = store.get_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, keep.id);
}

#[tokio::test]
async fn concurrent_creates_are_all_kept() {
    let store = memory_store();
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create(body_from(json!({
                    "documentType": "generic",
                    "data": {"title": format!("doc {}", i)}
                })))
                .await
                .unwrap()
                .id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids.dedup();
    assert_eq!(ids.len(), 16);
    assert_eq!(store.count().await.unwrap(), 16);
}

#[tokio::test]
async fn records_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docscan.db");

    let id = {
        let store = file_store(&path);
        let record = store.create(body_from(receipt_payload())).await.unwrap();
        store.close().await.unwrap();
        record.id
    };

    let store = file_store(&path);
    let record = store.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(record.data.get("merchantName"), Some(&json!("Old Name")));
    assert_eq!(record.additional_info.as_deref(), Some("Paid by card"));
}

#[tokio::test]
async fn search_finds_nested_item_names() {
    let store = memory_store();
    store.create(body_from(receipt_payload())).await.unwrap();
    store
        .create(body_from(json!({
            "documentType": "business_card",
            "data": {"name": "Ada Lovelace", "company": "Analytical Engines"}
        })))
        .await
        .unwrap();

    let hits = store.search("bagel").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_type, DocumentType::Receipt);
    assert_eq!(store.search("LOVELACE").await.unwrap().len(), 1);
    assert_eq!(store.search("").await.unwrap().len(), 2);
}

#[tokio::test]
async fn scan_then_reanalyze_replaces_analysis() {
    let store = memory_store();
    let engine = MockEngine::new("gpt-4o")
        .with_analysis(receipt_payload().to_string())
        .with_analysis(
            json!({
                "documentType": "invoice",
                "confidence": 0.8,
                "data": {"invoiceNumber": "INV-7"}
            })
            .to_string(),
        );
    let scanner = scanner(engine, store.clone());
    let image = EncodedImage::jpeg(b"\xff\xd8\xff");

    let first = scanner.scan(&image, "file:///a.jpg").await.unwrap();
    let second = scanner.reanalyze(&first.id, &image, None).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.document_type, DocumentType::Invoice);
    assert_eq!(second.data.get("invoiceNumber"), Some(&json!("INV-7")));
    assert_eq!(second.image_uri.as_deref(), Some("file:///a.jpg"));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn editing_missing_record_is_not_found() {
    let store = memory_store();
    let scanner = scanner(MockEngine::new("gpt-4o"), store);
    let err = scanner
        .edit(&RecordId::new(), &[FieldEdit::text("title", "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::NotFound(_)));
}

#[tokio::test]
async fn closed_store_refuses_calls() {
    let store = memory_store();
    store.close().await.unwrap();
    let err = store.create(body_from(receipt_payload())).await.unwrap_err();
    assert!(matches!(err, StorageError::Closed));
}
