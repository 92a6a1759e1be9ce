//! Static table of document types and the fields each one carries

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Closed set of recognized document kinds
///
/// Serializes as the snake_case tag stored in `documentType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    IdCard,
    DriverLicense,
    Receipt,
    Invoice,
    BusinessCard,
    Prescription,
    Contract,
    Generic,
}

impl DocumentType {
    /// Every recognized type, in registry order
    pub const ALL: [DocumentType; 9] = [
        DocumentType::Passport,
        DocumentType::IdCard,
        DocumentType::DriverLicense,
        DocumentType::Receipt,
        DocumentType::Invoice,
        DocumentType::BusinessCard,
        DocumentType::Prescription,
        DocumentType::Contract,
        DocumentType::Generic,
    ];

    /// Parse a tag, returning `None` for anything unrecognized
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "passport" => Some(Self::Passport),
            "id_card" => Some(Self::IdCard),
            "driver_license" => Some(Self::DriverLicense),
            "receipt" => Some(Self::Receipt),
            "invoice" => Some(Self::Invoice),
            "business_card" => Some(Self::BusinessCard),
            "prescription" => Some(Self::Prescription),
            "contract" => Some(Self::Contract),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }

    /// Parse a tag, falling back to `Generic`
    pub fn from_tag_or_generic(tag: &str) -> Self {
        Self::from_tag(tag).unwrap_or(Self::Generic)
    }

    /// The serialized tag
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::IdCard => "id_card",
            Self::DriverLicense => "driver_license",
            Self::Receipt => "receipt",
            Self::Invoice => "invoice",
            Self::BusinessCard => "business_card",
            Self::Prescription => "prescription",
            Self::Contract => "contract",
            Self::Generic => "generic",
        }
    }

    /// Display label stored under `data.type`
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Passport => "PASSPORT",
            Self::IdCard => "ID CARD",
            Self::DriverLicense => "DRIVER LICENSE",
            Self::Receipt => "RECEIPT",
            Self::Invoice => "INVOICE",
            Self::BusinessCard => "BUSINESS CARD",
            Self::Prescription => "MEDICAL PRESCRIPTION",
            Self::Contract => "CONTRACT",
            Self::Generic => "DOCUMENT",
        }
    }

    /// Declared fields of `data` for this type
    pub fn fields(&self) -> &'static [FieldDescriptor] {
        fields_for(*self)
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_tag())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown document type: {}", s))
    }
}

/// Shape of a single declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A text or numeric leaf
    Scalar,
    /// An object with its own declared sub-fields
    Object(&'static [&'static str]),
    /// A sequence of objects sharing the given sub-fields
    ObjectArray(&'static [&'static str]),
    /// A sequence of scalars
    ScalarArray,
}

impl FieldKind {
    /// The empty value a missing field of this kind is given
    pub fn placeholder(&self) -> Value {
        match self {
            FieldKind::Scalar => Value::String(String::new()),
            FieldKind::Object(sub_fields) => Value::Object(empty_object(sub_fields)),
            FieldKind::ObjectArray(_) | FieldKind::ScalarArray => Value::Array(Vec::new()),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldKind::Scalar)
    }

    /// Whether `value` already has the structure this kind expects
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::Scalar => !value.is_object() && !value.is_array(),
            FieldKind::Object(_) => value.is_object(),
            FieldKind::ObjectArray(_) | FieldKind::ScalarArray => value.is_array(),
        }
    }
}

/// A declared field: its key in `data` and its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn scalar(name: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind: FieldKind::Scalar,
    }
}

const fn object(name: &'static str, sub_fields: &'static [&'static str]) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind: FieldKind::Object(sub_fields),
    }
}

const fn object_array(name: &'static str, sub_fields: &'static [&'static str]) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind: FieldKind::ObjectArray(sub_fields),
    }
}

const fn scalar_array(name: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        name,
        kind: FieldKind::ScalarArray,
    }
}

/// Key of the display label every `data` object carries
pub const TYPE_FIELD: &str = "type";

const PASSPORT: &[FieldDescriptor] = &[
    scalar("country"),
    scalar("passportNumber"),
    scalar("surname"),
    scalar("givenNames"),
    scalar("nationality"),
    scalar("dateOfBirth"),
    scalar("sex"),
    scalar("placeOfBirth"),
    scalar("dateOfIssue"),
    scalar("dateOfExpiry"),
    scalar("authority"),
    scalar("mrzLine1"),
    scalar("mrzLine2"),
];

const ID_CARD: &[FieldDescriptor] = &[
    scalar("idNumber"),
    scalar("fullName"),
    scalar("dateOfBirth"),
    scalar("sex"),
    scalar("nationality"),
    scalar("address"),
    scalar("dateOfIssue"),
    scalar("dateOfExpiry"),
];

const DRIVER_LICENSE: &[FieldDescriptor] = &[
    scalar("licenseNumber"),
    scalar("fullName"),
    scalar("address"),
    scalar("dateOfBirth"),
    scalar("sex"),
    scalar("height"),
    scalar("eyeColor"),
    scalar("dateOfIssue"),
    scalar("dateOfExpiry"),
    scalar("class"),
    scalar("restrictions"),
    scalar("endorsements"),
];

const RECEIPT: &[FieldDescriptor] = &[
    scalar("merchantName"),
    scalar("merchantAddress"),
    scalar("merchantPhone"),
    scalar("date"),
    scalar("time"),
    object_array("items", &["name", "quantity", "price", "total"]),
    scalar("subtotal"),
    scalar("tax"),
    scalar("total"),
    scalar("currency"),
    scalar("paymentMethod"),
];

const INVOICE: &[FieldDescriptor] = &[
    scalar("invoiceNumber"),
    scalar("date"),
    scalar("dueDate"),
    object("vendor", &["name", "address", "phone", "email"]),
    object("billTo", &["name", "address"]),
    object_array("items", &["description", "quantity", "unitPrice", "total"]),
    scalar("subtotal"),
    scalar("tax"),
    scalar("total"),
    scalar("currency"),
];

const BUSINESS_CARD: &[FieldDescriptor] = &[
    scalar("name"),
    scalar("title"),
    scalar("company"),
    scalar("phone"),
    scalar("email"),
    scalar("website"),
    scalar("address"),
];

const PRESCRIPTION: &[FieldDescriptor] = &[
    scalar("patientName"),
    scalar("patientDOB"),
    scalar("doctorName"),
    scalar("clinicName"),
    scalar("date"),
    object_array(
        "medications",
        &["name", "dosage", "frequency", "duration", "instructions"],
    ),
];

const CONTRACT: &[FieldDescriptor] = &[
    scalar("title"),
    scalar("date"),
    object_array("parties", &["name", "role"]),
    scalar("effectiveDate"),
    scalar("expiryDate"),
    scalar_array("keyTerms"),
];

const GENERIC: &[FieldDescriptor] = &[scalar("title"), scalar("summary")];

/// Declared fields for a document type, in canonical order
pub fn fields_for(doc_type: DocumentType) -> &'static [FieldDescriptor] {
    match doc_type {
        DocumentType::Passport => PASSPORT,
        DocumentType::IdCard => ID_CARD,
        DocumentType::DriverLicense => DRIVER_LICENSE,
        DocumentType::Receipt => RECEIPT,
        DocumentType::Invoice => INVOICE,
        DocumentType::BusinessCard => BUSINESS_CARD,
        DocumentType::Prescription => PRESCRIPTION,
        DocumentType::Contract => CONTRACT,
        DocumentType::Generic => GENERIC,
    }
}

/// Declared fields for a raw tag; unknown tags get the generic set
pub fn fields_for_tag(tag: &str) -> &'static [FieldDescriptor] {
    fields_for(DocumentType::from_tag_or_generic(tag))
}

/// Look up a single declared field by name
pub fn descriptor(doc_type: DocumentType, name: &str) -> Option<&'static FieldDescriptor> {
    fields_for(doc_type).iter().find(|f| f.name == name)
}

fn empty_object(sub_fields: &[&str]) -> Map<String, Value> {
    sub_fields
        .iter()
        .map(|name| (name.to_string(), Value::String(String::new())))
        .collect()
}

/// Bring one value into the structure `kind` declares
///
/// `None` and `null` become the placeholder. A lone value in an array slot
/// is wrapped; a non-object in an object slot is replaced. Declared
/// sub-fields of objects (including objects inside arrays) are filled in,
/// everything else already there is kept.
pub fn conform_value(kind: FieldKind, value: Option<Value>) -> Value {
    let value = match value {
        None | Some(Value::Null) => return kind.placeholder(),
        Some(v) => v,
    };

    match kind {
        FieldKind::Scalar => value,
        FieldKind::Object(sub_fields) => match value {
            Value::Object(mut map) => {
                fill_sub_fields(&mut map, sub_fields);
                Value::Object(map)
            }
            _ => kind.placeholder(),
        },
        FieldKind::ObjectArray(sub_fields) => {
            let items = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut map) => {
                            fill_sub_fields(&mut map, sub_fields);
                            Value::Object(map)
                        }
                        other => other,
                    })
                    .collect(),
            )
        }
        FieldKind::ScalarArray => match value {
            Value::Array(items) => Value::Array(items),
            other => Value::Array(vec![other]),
        },
    }
}

fn fill_sub_fields(map: &mut Map<String, Value>, sub_fields: &[&str]) {
    for name in sub_fields {
        let current = map.get(*name);
        if current.is_none() || current == Some(&Value::Null) {
            map.insert(name.to_string(), Value::String(String::new()));
        }
    }
}

/// Make `map` carry every declared field of `doc_type` plus a `type` label
///
/// Keys come out as `type`, the declared fields in registry order, then any
/// undeclared keys in their original order. Idempotent.
pub fn conform(doc_type: DocumentType, map: &mut Map<String, Value>) {
    let mut source = std::mem::take(map);
    let declared = fields_for(doc_type);

    let label = match source.get(TYPE_FIELD) {
        Some(Value::String(label)) => Value::String(label.clone()),
        _ => Value::String(doc_type.display_label().to_string()),
    };
    map.insert(TYPE_FIELD.to_string(), label);

    for field in declared {
        let current = source.get_mut(field.name).map(Value::take);
        map.insert(field.name.to_string(), conform_value(field.kind, current));
    }

    for (key, value) in source {
        if key == TYPE_FIELD || declared.iter().any(|f| f.name == key) {
            continue;
        }
        map.insert(key, value);
    }
}
