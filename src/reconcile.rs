//! Edit reconciliation
//!
//! Merges user edits into a record's `data` without touching anything the
//! extraction produced outside of it. Scalars are edited in place; array
//! and object fields are only ever replaced whole, with a value of the same
//! shape. New nested structures are never introduced.

use crate::schema::{conform_value, descriptor, DocumentData, DocumentType, FieldKind, TYPE_FIELD};
use serde_json::Value;
use tracing::debug;

/// A single field-level edit
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEdit {
    pub field: String,
    pub value: Value,
}

impl FieldEdit {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// A text edit, the common case from an edit form
    pub fn text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Value::String(value.into()))
    }
}

/// Why an edit was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    NotScalar,
    ShapeMismatch,
    NewStructure,
}

/// Apply `edits` in order to a copy of `data`
///
/// Edits that would change a field's shape are skipped; the rest are
/// applied. Never fails.
pub fn reconcile(doc_type: DocumentType, data: &DocumentData, edits: &[FieldEdit]) -> DocumentData {
    let mut result = data.clone();
    for edit in edits {
        if let Err(reason) = apply_edit(doc_type, &mut result, edit) {
            debug!(field = %edit.field, ?reason, "skipping edit");
        }
    }
    result
}

/// Apply one edit to a copy of `data`
pub fn reconcile_one(doc_type: DocumentType, data: &DocumentData, edit: FieldEdit) -> DocumentData {
    reconcile(doc_type, data, std::slice::from_ref(&edit))
}

fn apply_edit(
    doc_type: DocumentType,
    data: &mut DocumentData,
    edit: &FieldEdit,
) -> Result<(), Skip> {
    let kind = if edit.field == TYPE_FIELD {
        Some(FieldKind::Scalar)
    } else {
        descriptor(doc_type, &edit.field).map(|d| d.kind)
    };

    match kind {
        Some(FieldKind::Scalar) => {
            if !FieldKind::Scalar.accepts(&edit.value) {
                return Err(Skip::NotScalar);
            }
            data.insert(edit.field.clone(), edit.value.clone());
        }
        Some(kind) => {
            if !kind.accepts(&edit.value) {
                return Err(Skip::ShapeMismatch);
            }
            let value = conform_value(kind, Some(edit.value.clone()));
            data.insert(edit.field.clone(), value);
        }
        None => {
            // Undeclared: kept for forward compatibility, scalars only
            if !FieldKind::Scalar.accepts(&edit.value) {
                return Err(Skip::NewStructure);
            }
            data.insert(edit.field.clone(), edit.value.clone());
        }
    }
    Ok(())
}
