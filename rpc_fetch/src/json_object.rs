//! Extension traits for JSON field access and truthiness checks
//!
//! Wire payloads are read through `JsonField` names instead of bare string literals,
//! and through `is_truthy` wherever the protocol only cares whether a value is "set".

use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumIter};

/// Field names used on the JSON-RPC wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum JsonField {
    /// Protocol version marker
    Jsonrpc,
    /// Correlation id
    Id,
    /// Method name on requests
    Method,
    /// Method parameters on requests
    Params,
    /// Successful payload
    Result,
    /// Error payload
    Error,
    /// Error code
    Code,
    /// Error message
    Message,
    /// Error details, or the page items inside an envelope
    Data,
    /// Total number of items across all pages
    Total,
    /// Items per page
    PageSize,
    /// Index of the returned page
    CurrentPage,
    /// Number of pages
    TotalPages,
}

impl From<JsonField> for String {
    fn from(field: JsonField) -> Self { field.as_ref().to_string() }
}

/// The keys a `result` object must carry to be read as a paging envelope
pub const ENVELOPE_FIELDS: [JsonField; 5] = [
    JsonField::TotalPages,
    JsonField::CurrentPage,
    JsonField::PageSize,
    JsonField::Total,
    JsonField::Data,
];

/// Extension trait for type-safe JSON field access
pub trait JsonObjectAccess {
    /// Get field value using any type that can be a string reference
    fn get_field<T: AsRef<str>>(&self, field: T) -> Option<&Value>;

    /// Get field value as string
    fn get_field_str<T: AsRef<str>>(&self, field: T) -> Option<&str>;

    /// Whether the field key is present at all, regardless of its value
    fn has_field<T: AsRef<str>>(&self, field: T) -> bool;

    /// Field value only when it is truthy
    fn get_truthy_field<T: AsRef<str>>(&self, field: T) -> Option<&Value> {
        self.get_field(field).filter(|value| value.is_truthy())
    }
}

impl JsonObjectAccess for Value {
    fn get_field<T: AsRef<str>>(&self, field: T) -> Option<&Self> { self.get(field.as_ref()) }

    fn get_field_str<T: AsRef<str>>(&self, field: T) -> Option<&str> {
        self.get(field.as_ref()).and_then(Self::as_str)
    }

    fn has_field<T: AsRef<str>>(&self, field: T) -> bool {
        self.as_object()
            .is_some_and(|obj| obj.contains_key(field.as_ref()))
    }
}

impl JsonObjectAccess for Map<String, Value> {
    fn get_field<T: AsRef<str>>(&self, field: T) -> Option<&Value> { self.get(field.as_ref()) }

    fn get_field_str<T: AsRef<str>>(&self, field: T) -> Option<&str> {
        self.get(field.as_ref()).and_then(Value::as_str)
    }

    fn has_field<T: AsRef<str>>(&self, field: T) -> bool { self.contains_key(field.as_ref()) }
}

/// JSON truthiness
///
/// `null`, `false`, zero and the empty string are falsy. Every object and array is
/// truthy, including empty ones.
pub trait Truthy {
    /// Whether the value counts as "set"
    fn is_truthy(&self) -> bool;
}

impl Truthy for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }
}
