//! The per-type `data` payload of a document record

use super::registry::{self, DocumentType, TYPE_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field payload of a record
///
/// An ordered JSON object whose keys are the declared fields of the record's
/// [`DocumentType`], the `type` display label, and any undeclared keys kept
/// for forward compatibility. Serializes as a plain object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentData(Map<String, Value>);

impl DocumentData {
    /// Data with every declared field of `doc_type` at its placeholder
    pub fn empty(doc_type: DocumentType) -> Self {
        let mut map = Map::new();
        registry::conform(doc_type, &mut map);
        Self(map)
    }

    /// Wrap a map as-is, without conforming it
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a map after filling in the fields `doc_type` declares
    pub fn conformed(doc_type: DocumentType, mut map: Map<String, Value>) -> Self {
        registry::conform(doc_type, &mut map);
        Self(map)
    }

    /// Fill in any fields `doc_type` declares that are missing
    pub fn conform_to(&mut self, doc_type: DocumentType) {
        registry::conform(doc_type, &mut self.0);
    }

    /// The display label, e.g. `RECEIPT`
    pub fn type_label(&self) -> Option<&str> {
        self.0.get(TYPE_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// A field's value as text, for scalar fields holding strings or numbers
    pub fn get_text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<DocumentData> for Value {
    fn from(data: DocumentData) -> Self {
        Value::Object(data.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_generic_has_label_and_fields() {
        let data = DocumentData::empty(DocumentType::Generic);
        assert_eq!(data.type_label(), Some("DOCUMENT"));
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["type", "title", "summary"]);
    }

    #[test]
    fn serializes_as_plain_object() {
        let data = DocumentData::empty(DocumentType::Generic);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({"type": "DOCUMENT", "title": "", "summary": ""}));

        let back: DocumentData = serde_json::from_value(value).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn get_text_renders_numbers() {
        let map = json!({"total": 42.5, "currency": "USD", "items": []})
            .as_object()
            .unwrap()
            .clone();
        let data = DocumentData::from_map(map);
        assert_eq!(data.get_text("total").as_deref(), Some("42.5"));
        assert_eq!(data.get_text("currency").as_deref(), Some("USD"));
        assert_eq!(data.get_text("items"), None);
        assert_eq!(data.get_text("missing"), None);
    }
}
