//! Result normalization
//!
//! Coerces whatever the analysis engine returned into a well-formed
//! [`DocumentBody`]. The engine's output is imperfect by nature, so
//! irregularities are corrected here rather than rejected: unknown tags
//! fall back to `generic`, confidence is clamped, declared fields that are
//! missing get placeholders, and undeclared fields pass through untouched.
//!
//! The only failure is a payload that is not a JSON object at all.
//!
//! Everything here is a pure function of its inputs; the caller supplies
//! the analysis timestamp and model id.

use crate::record::{clamp_confidence, DocumentBody};
use crate::schema::{DocumentData, DocumentType, TYPE_FIELD};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Errors from normalization
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Extract the JSON object from an engine response
///
/// The whole text is tried first. Engines sometimes wrap the object in prose
/// or code fences, so the span from the first `{` to the last `}` is tried
/// next.
pub fn parse_payload(text: &str) -> NormalizeResult<Map<String, Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::MalformedPayload("empty response".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Object(map) => Ok(map),
            other => Err(NormalizeError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        };
    }

    let (start, end) = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(NormalizeError::MalformedPayload(
                "no JSON object found in response".to_string(),
            ))
        }
    };

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(NormalizeError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(NormalizeError::MalformedPayload(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse and normalize an engine response in one step
pub fn normalize_text(
    text: &str,
    analyzed_at: DateTime<Utc>,
    model: &str,
) -> NormalizeResult<DocumentBody> {
    let payload = parse_payload(text)?;
    Ok(normalize_payload(payload, analyzed_at, model))
}

/// Normalize an already-parsed value
///
/// Fails only when `payload` is not an object.
pub fn normalize(
    payload: Value,
    analyzed_at: DateTime<Utc>,
    model: &str,
) -> NormalizeResult<DocumentBody> {
    match payload {
        Value::Object(map) => Ok(normalize_payload(map, analyzed_at, model)),
        other => Err(NormalizeError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Normalize a payload object; total over all objects
pub fn normalize_payload(
    mut payload: Map<String, Value>,
    analyzed_at: DateTime<Utc>,
    model: &str,
) -> DocumentBody {
    let raw_tag = payload
        .get("documentType")
        .and_then(Value::as_str)
        .map(str::to_string);
    let recognized = raw_tag.as_deref().and_then(DocumentType::from_tag);
    let document_type = recognized.unwrap_or(DocumentType::Generic);

    let mut data = match payload.remove("data") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    if recognized.is_none() {
        warn!(tag = ?raw_tag, "unrecognized document type, treating as generic");
        data.insert(
            TYPE_FIELD.to_string(),
            Value::String(DocumentType::Generic.display_label().to_string()),
        );
    }

    DocumentBody {
        document_type,
        confidence: confidence_of(payload.get("confidence")),
        languages: languages_of(payload.remove("languages")),
        data: DocumentData::conformed(document_type, data),
        raw_text: text_of(payload.remove("rawText")).unwrap_or_default(),
        additional_info: text_of(payload.remove("additionalInfo")),
        analyzed_at,
        model: model.to_string(),
        image_uri: None,
    }
}

fn confidence_of(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .map(clamp_confidence)
        .unwrap_or(0.0)
}

fn languages_of(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn text_of(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields_for;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-08T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn run(payload: Value) -> DocumentBody {
        normalize(payload, at(), "gpt-4o").unwrap()
    }

    #[test]
    fn unknown_tag_becomes_generic_document() {
        let body = run(json!({
            "documentType": "foo",
            "confidence": 0.9,
            "data": {"type": "FOO", "title": "Quarterly report"}
        }));
        assert_eq!(body.document_type, DocumentType::Generic);
        assert_eq!(body.data.type_label(), Some("DOCUMENT"));
        assert_eq!(body.data.get("title"), Some(&json!("Quarterly report")));
        assert_eq!(body.data.get("summary"), Some(&json!("")));
    }

    #[test]
    fn missing_tag_becomes_generic() {
        let body = run(json!({"data": {}}));
        assert_eq!(body.document_type, DocumentType::Generic);
        assert_eq!(body.data.type_label(), Some("DOCUMENT"));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(run(json!({"confidence": 4.2})).confidence, 1.0);
        assert_eq!(run(json!({"confidence": -1})).confidence, 0.0);
        assert_eq!(run(json!({"confidence": 0.73})).confidence, 0.73);
    }

    #[test]
    fn non_numeric_confidence_defaults_to_zero() {
        assert_eq!(run(json!({"confidence": "high"})).confidence, 0.0);
        assert_eq!(run(json!({})).confidence, 0.0);
    }

    #[test]
    fn every_declared_field_is_present() {
        for doc_type in DocumentType::ALL {
            let body = run(json!({"documentType": doc_type.as_tag(), "data": {}}));
            assert_eq!(body.document_type, doc_type);
            for field in fields_for(doc_type) {
                assert!(
                    body.data.contains(field.name),
                    "{} missing {}",
                    doc_type,
                    field.name
                );
            }
            assert_eq!(body.data.type_label(), Some(doc_type.display_label()));
        }
    }

    #[test]
    fn placeholders_follow_field_kind() {
        let body = run(json!({"documentType": "invoice", "data": {"type": "INVOICE"}}));
        assert_eq!(body.data.get("invoiceNumber"), Some(&json!("")));
        assert_eq!(body.data.get("items"), Some(&json!([])));
        assert_eq!(
            body.data.get("billTo"),
            Some(&json!({"name": "", "address": ""}))
        );
    }

    #[test]
    fn partial_nested_object_gets_sub_fields() {
        let body = run(json!({
            "documentType": "invoice",
            "data": {"vendor": {"name": "ACME", "taxId": "99"}}
        }));
        assert_eq!(
            body.data.get("vendor"),
            Some(&json!({"name": "ACME", "taxId": "99", "address": "", "phone": "", "email": ""}))
        );
    }

    #[test]
    fn undeclared_fields_are_preserved() {
        let body = run(json!({
            "documentType": "receipt",
            "data": {"merchantName": "Shop", "loyaltyPoints": 120, "cashier": {"id": 7}}
        }));
        assert_eq!(body.data.get("loyaltyPoints"), Some(&json!(120)));
        assert_eq!(body.data.get("cashier"), Some(&json!({"id": 7})));
    }

    #[test]
    fn numbers_in_scalar_fields_are_kept() {
        let body = run(json!({"documentType": "receipt", "data": {"total": 42.5}}));
        assert_eq!(body.data.get("total"), Some(&json!(42.5)));
    }

    #[test]
    fn metadata_is_attached() {
        let body = run(json!({
            "documentType": "generic",
            "languages": ["English", 3, "French"],
            "rawText": "Hello",
            "additionalInfo": "translated"
        }));
        assert_eq!(body.analyzed_at, at());
        assert_eq!(body.model, "gpt-4o");
        assert_eq!(body.languages, vec!["English", "French"]);
        assert_eq!(body.raw_text, "Hello");
        assert_eq!(body.additional_info.as_deref(), Some("translated"));
        assert_eq!(body.image_uri, None);
    }

    #[test]
    fn irregular_metadata_is_defaulted() {
        let body = run(json!({"languages": "English", "rawText": null, "data": "oops"}));
        assert!(body.languages.is_empty());
        assert_eq!(body.raw_text, "");
        assert_eq!(body.additional_info, None);
        assert_eq!(body.data.get("title"), Some(&json!("")));
    }

    #[test]
    fn normalization_is_deterministic() {
        let payload = json!({"documentType": "contract", "data": {"keyTerms": "net 30"}});
        assert_eq!(run(payload.clone()), run(payload));
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let err = normalize(json!([1, 2]), at(), "m").unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedPayload(_)));
    }

    #[test]
    fn parse_payload_accepts_plain_json() {
        let map = parse_payload(r#"{"documentType": "receipt"}"#).unwrap();
        assert_eq!(map["documentType"], json!("receipt"));
    }

    #[test]
    fn parse_payload_extracts_wrapped_json() {
        let text = concat!(
            "Here is the result:\n```json\n",
            "{\"documentType\": \"passport\", \"data\": {}}\n```"
        );
        let map = parse_payload(text).unwrap();
        assert_eq!(map["documentType"], json!("passport"));
    }

    #[test]
    fn parse_payload_rejects_garbage() {
        for text in ["", "   ", "no json here", "{ not json }", "[1, 2, 3]", "\"str\""] {
            let err = parse_payload(text).unwrap_err();
            assert!(matches!(err, NormalizeError::MalformedPayload(_)), "{}", text);
        }
    }

    #[test]
    fn normalize_text_combines_both_steps() {
        let body = normalize_text(
            r#"{"documentType": "business_card", "confidence": 0.5, "data": {"name": "Ana"}}"#,
            at(),
            "gpt-4o",
        )
        .unwrap();
        assert_eq!(body.document_type, DocumentType::BusinessCard);
        assert_eq!(body.data.get("name"), Some(&json!("Ana")));
        assert_eq!(body.data.get("email"), Some(&json!("")));
    }
}
