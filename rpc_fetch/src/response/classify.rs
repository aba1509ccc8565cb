//! Response classification
//!
//! A reply is first checked for being a response at all (an object with an `error` or
//! `result` key), then sorted into one of three kinds. A truthy `error` always wins, even
//! when a `result` is present too.
//!
//! `RawResponse::decode` performs the probing once and hands the extractor a tagged view,
//! so the raw object is not re-inspected further down the call chain.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use crate::json_object::{ENVELOPE_FIELDS, JsonField, JsonObjectAccess, Truthy};

/// The three shapes a response can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ResponseKind {
    /// Server error, or no usable result
    Error,
    /// Plain result
    Data,
    /// Result wrapped in a paging envelope
    PagedData,
}

/// How a `result` that is present but falsy (`null`, `false`, `0`, `""`) is classified
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Display,
    AsRefStr,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FalsyResult {
    /// Treat it as an ordinary data result
    #[default]
    Data,
    /// Route it to the error branch, as if no result had been sent
    Error,
}

impl FalsyResult {
    /// Parse a policy name, `data` or `error`
    pub fn parse(value: &str) -> Option<Self> { Self::from_str(value.trim()).ok() }
}

/// Whether `value` is an object holding an `error` or a `result` key
pub fn is_response(value: &Value) -> bool {
    value.has_field(JsonField::Error) || value.has_field(JsonField::Result)
}

/// Whether `value` is a non-error response whose `result` carries every envelope key
///
/// Only key presence is checked here; the envelope itself is validated during extraction.
pub fn is_paged_response(value: &Value) -> bool {
    if !is_response(value) || value.get_truthy_field(JsonField::Error).is_some() {
        return false;
    }

    value
        .get_truthy_field(JsonField::Result)
        .is_some_and(|result| ENVELOPE_FIELDS.iter().all(|field| result.has_field(field)))
}

/// Classify a response
///
/// Callers should check `is_response` first; a value without `error` or `result`
/// classifies as `Error`.
pub fn classify(value: &Value, falsy_result: FalsyResult) -> ResponseKind {
    if value.get_truthy_field(JsonField::Error).is_some() {
        return ResponseKind::Error;
    }

    let has_result = match falsy_result {
        FalsyResult::Data => value.has_field(JsonField::Result),
        FalsyResult::Error => value.get_truthy_field(JsonField::Result).is_some(),
    };

    if !has_result {
        ResponseKind::Error
    } else if is_paged_response(value) {
        ResponseKind::PagedData
    } else {
        ResponseKind::Data
    }
}

/// Tagged view over a raw response, borrowed from the decoded JSON
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse<'a> {
    /// Error branch; `error` is absent when the reply had no usable result or error
    Error {
        /// The raw `error` value
        error: Option<&'a Value>,
        /// Normalized raw id
        id:    Option<String>,
    },
    /// Plain result
    Data {
        /// The raw `result` value
        result: &'a Value,
        /// Normalized raw id
        id:     Option<String>,
    },
    /// Result that carries every envelope key
    Paged {
        /// The raw `result` object
        envelope: &'a Map<String, Value>,
        /// Normalized raw id
        id:       Option<String>,
    },
}

impl<'a> RawResponse<'a> {
    /// Decode `value` into a tagged view, or `None` when it is not a response at all
    pub fn decode(value: &'a Value, falsy_result: FalsyResult) -> Option<Self> {
        if !is_response(value) {
            return None;
        }

        let id = raw_id(value);
        let result = value.get_field(JsonField::Result);

        let raw = match (classify(value, falsy_result), result) {
            (ResponseKind::PagedData, Some(Value::Object(envelope))) => {
                Self::Paged { envelope, id }
            }
            (ResponseKind::Data, Some(result)) => Self::Data { result, id },
            _ => Self::Error {
                error: value.get_field(JsonField::Error),
                id,
            },
        };
        Some(raw)
    }

    /// The kind this view was decoded as
    pub const fn kind(&self) -> ResponseKind {
        match self {
            Self::Error { .. } => ResponseKind::Error,
            Self::Data { .. } => ResponseKind::Data,
            Self::Paged { .. } => ResponseKind::PagedData,
        }
    }

    /// Normalized raw id
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Error { id, .. } | Self::Data { id, .. } | Self::Paged { id, .. } => {
                id.as_deref()
            }
        }
    }
}

/// The reply's own id: non-empty strings as-is, numbers as decimal text
fn raw_id(value: &Value) -> Option<String> {
    match value.get_field(JsonField::Id)? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
