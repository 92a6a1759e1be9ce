//! Document type schemas
//!
//! The registry is the single source of truth for which document types
//! exist and what fields each type's `data` carries. Everything here is
//! pure: no I/O, no clock.

mod data;
mod registry;

pub use data::DocumentData;
pub use registry::{
    conform, conform_value, descriptor, fields_for, fields_for_tag, DocumentType,
    FieldDescriptor, FieldKind, TYPE_FIELD,
};
