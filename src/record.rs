//! DocumentRecord: one analyzed document and its metadata

use crate::schema::{DocumentData, DocumentType};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a record
///
/// Serializes as a plain string. Assigned once by the store, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new random RecordId (UUID-based)
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a RecordId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Clamp a confidence score into `[0, 1]`; NaN becomes 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Everything a record holds except its identity and timestamps
///
/// Produced by the normalizer and handed to the store's `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub document_type: DocumentType,
    pub confidence: f64,
    #[serde(default)]
    pub languages: Vec<String>,
    pub data: DocumentData,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub additional_info: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    pub model: String,
    #[serde(default)]
    pub image_uri: Option<String>,
}

impl DocumentBody {
    /// Attach the source image reference
    pub fn with_image_uri(mut self, uri: impl Into<String>) -> Self {
        self.image_uri = Some(uri.into());
        self
    }
}

/// The persisted unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: RecordId,
    pub document_type: DocumentType,
    pub confidence: f64,
    #[serde(default)]
    pub languages: Vec<String>,
    pub data: DocumentData,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub additional_info: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    pub model: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Build a fresh record from a body; `created_at == updated_at == now`
    pub(crate) fn from_body(id: RecordId, body: DocumentBody, now: DateTime<Utc>) -> Self {
        let mut data = body.data;
        data.conform_to(body.document_type);
        Self {
            id,
            document_type: body.document_type,
            confidence: clamp_confidence(body.confidence),
            languages: body.languages,
            data,
            raw_text: body.raw_text,
            additional_info: body.additional_info,
            analyzed_at: body.analyzed_at,
            model: body.model,
            image_uri: body.image_uri,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update and advance `updated_at`
    ///
    /// `updated_at` always moves strictly forward, even if the clock has not.
    pub(crate) fn apply(&mut self, patch: RecordPatch, now: DateTime<Utc>) {
        if let Some(document_type) = patch.document_type {
            self.document_type = document_type;
        }
        if let Some(confidence) = patch.confidence {
            self.confidence = clamp_confidence(confidence);
        }
        if let Some(languages) = patch.languages {
            self.languages = languages;
        }
        if let Some(data) = patch.data {
            self.data = data;
        }
        if let Some(raw_text) = patch.raw_text {
            self.raw_text = raw_text;
        }
        if let Some(additional_info) = patch.additional_info {
            self.additional_info = additional_info;
        }
        if let Some(analyzed_at) = patch.analyzed_at {
            self.analyzed_at = analyzed_at;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(image_uri) = patch.image_uri {
            self.image_uri = image_uri;
        }

        self.data.conform_to(self.document_type);
        self.updated_at = advance(self.updated_at, now);
    }
}

fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// A partial update for [`DocumentRecord`]
///
/// Only the fields set are merged. Identity and creation time are not
/// representable here, so they can never be changed through an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub document_type: Option<DocumentType>,
    pub confidence: Option<f64>,
    pub languages: Option<Vec<String>>,
    pub data: Option<DocumentData>,
    pub raw_text: Option<String>,
    pub additional_info: Option<Option<String>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub model: Option<String>,
    pub image_uri: Option<Option<String>>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch that replaces only `data`, the usual result of an edit
    pub fn data(data: DocumentData) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_additional_info(mut self, info: Option<String>) -> Self {
        self.additional_info = Some(info);
        self
    }
}

/// Re-analysis replaces every analysis-derived field at once
///
/// The image reference is only replaced when the new body carries one.
impl From<DocumentBody> for RecordPatch {
    fn from(body: DocumentBody) -> Self {
        Self {
            document_type: Some(body.document_type),
            confidence: Some(body.confidence),
            languages: Some(body.languages),
            data: Some(body.data),
            raw_text: Some(body.raw_text),
            additional_info: Some(body.additional_info),
            analyzed_at: Some(body.analyzed_at),
            model: Some(body.model),
            image_uri: body.image_uri.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_display_honors_width() {
        let id = RecordId::from("abc");
        assert_eq!(format!("[{:<6}]", id), "[abc   ]");
        assert_eq!(id.to_string(), "abc");
    }

    fn body() -> DocumentBody {
        DocumentBody {
            document_type: DocumentType::Generic,
            confidence: 0.8,
            languages: vec!["English".to_string()],
            data: DocumentData::empty(DocumentType::Generic),
            raw_text: "hello".to_string(),
            additional_info: None,
            analyzed_at: Utc::now(),
            model: "test-model".to_string(),
            image_uri: Some("file:///tmp/a.jpg".to_string()),
        }
    }

    #[test]
    fn record_id_is_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }

    #[test]
    fn clamp_confidence_bounds() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn from_body_sets_equal_timestamps() {
        let now = Utc::now();
        let record = DocumentRecord::from_body(RecordId::new(), body(), now);
        assert_eq!(record.created_at, now);
        assert_eq!(record.updated_at, now);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let record = DocumentRecord::from_body(RecordId::from("r1"), body(), Utc::now());
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "id",
            "documentType",
            "confidence",
            "languages",
            "data",
            "rawText",
            "additionalInfo",
            "analyzedAt",
            "model",
            "imageUri",
            "createdAt",
            "updatedAt",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(value["documentType"], json!("generic"));
    }

    #[test]
    fn apply_advances_updated_at_even_with_stale_clock() {
        let now = Utc::now();
        let mut record = DocumentRecord::from_body(RecordId::new(), body(), now);
        record.apply(RecordPatch::new().with_additional_info(Some("x".into())), now);
        assert!(record.updated_at > record.created_at);
        assert_eq!(record.additional_info.as_deref(), Some("x"));
    }

    #[test]
    fn apply_clamps_confidence() {
        let now = Utc::now();
        let mut record = DocumentRecord::from_body(RecordId::new(), body(), now);
        let patch = RecordPatch {
            confidence: Some(3.0),
            ..Default::default()
        };
        record.apply(patch, now);
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn type_change_reshapes_data() {
        let now = Utc::now();
        let mut record = DocumentRecord::from_body(RecordId::new(), body(), now);
        let patch = RecordPatch {
            document_type: Some(DocumentType::Contract),
            ..Default::default()
        };
        record.apply(patch, now);
        assert!(record.data.contains("keyTerms"));
        // label and old fields stay, they are just no longer declared
        assert_eq!(record.data.type_label(), Some("DOCUMENT"));
        assert!(record.data.contains("summary"));
    }

    #[test]
    fn patch_from_body_keeps_image_when_absent() {
        let mut b = body();
        b.image_uri = None;
        let patch = RecordPatch::from(b);
        assert_eq!(patch.image_uri, None);
    }
}
