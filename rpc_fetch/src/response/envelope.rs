//! Pagination envelope validation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::json_object::{JsonField, JsonObjectAccess};

/// Reasons a `result` object cannot be read as a paging envelope
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// `data` is missing or not an array
    #[error("data must be an array")]
    DataNotArray,

    /// A page counter is missing or not a non-negative integer
    #[error("{field} must be a number")]
    NotANumber {
        /// Name of the offending counter
        field: JsonField,
    },
}

/// One page of results plus its pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedEnvelope<T = Value> {
    /// Items on this page
    pub data:         Vec<T>,
    /// Total number of items across all pages
    pub total:        u64,
    /// Items per page
    pub page_size:    u64,
    /// Index of this page
    pub current_page: u64,
    /// Number of pages
    pub total_pages:  u64,
}

impl PagedEnvelope<Value> {
    /// Validate a raw `result` object
    ///
    /// Counters may be JSON integers, integral floats or numeric strings. The first
    /// failing check is reported, `data` first, then the counters in declaration order.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, EnvelopeError> {
        let data = object
            .get_field(JsonField::Data)
            .and_then(Value::as_array)
            .cloned()
            .ok_or(EnvelopeError::DataNotArray)?;

        Ok(Self {
            data,
            total: counter(object, JsonField::Total)?,
            page_size: counter(object, JsonField::PageSize)?,
            current_page: counter(object, JsonField::CurrentPage)?,
            total_pages: counter(object, JsonField::TotalPages)?,
        })
    }

    /// Validate a raw `result` value, which must be an object
    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        value
            .as_object()
            .ok_or(EnvelopeError::DataNotArray)
            .and_then(Self::from_object)
    }

    /// Deserialize every item into `T`
    pub fn decode<T>(self) -> serde_json::Result<PagedEnvelope<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let data = self
            .data
            .into_iter()
            .map(serde_json::from_value)
            .collect::<serde_json::Result<Vec<T>>>()?;

        Ok(PagedEnvelope {
            data,
            total: self.total,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
        })
    }
}

impl<T> PagedEnvelope<T> {
    /// Number of items on this page
    pub fn len(&self) -> usize { self.data.len() }

    /// Whether this page holds no items
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Whether pages follow this one
    pub const fn has_next_page(&self) -> bool { self.current_page < self.total_pages }
}

fn counter(object: &Map<String, Value>, field: JsonField) -> Result<u64, EnvelopeError> {
    object
        .get_field(field)
        .and_then(parse_counter)
        .ok_or(EnvelopeError::NotANumber { field })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "float is checked to be integral and in range first"
)]
fn parse_counter(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(value: &Value) -> Result<PagedEnvelope, EnvelopeError> {
        PagedEnvelope::from_value(value)
    }

    #[test]
    fn test_valid_envelope() {
        let page = envelope(&json!({
            "data": [{"n": 1}, {"n": 2}],
            "total": 12,
            "page_size": 2,
            "current_page": 1,
            "total_pages": 6
        }))
        .unwrap();

        assert_eq!(page.data, vec![json!({"n": 1}), json!({"n": 2})]);
        assert_eq!(page.total, 12);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 6);
        assert_eq!(page.len(), 2);
        assert!(page.has_next_page());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let page = envelope(&json!({
            "data": [],
            "total": "40",
            "page_size": " 20 ",
            "current_page": 2.0,
            "total_pages": "2"
        }))
        .unwrap();

        assert_eq!(
            (page.total, page.page_size, page.current_page, page.total_pages),
            (40, 20, 2, 2)
        );
        assert!(page.is_empty());
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_data_must_be_array() {
        let base = json!({"total": 1, "page_size": 1, "current_page": 1, "total_pages": 1});

        let mut missing = base;
        assert_eq!(envelope(&missing), Err(EnvelopeError::DataNotArray));

        missing["data"] = json!({"0": "a"});
        assert_eq!(envelope(&missing), Err(EnvelopeError::DataNotArray));

        assert_eq!(envelope(&json!([])), Err(EnvelopeError::DataNotArray));
    }

    #[test]
    fn test_bad_counters() {
        for bad in [json!(null), json!("abc"), json!(-1), json!(1.5), json!(true), json!("")] {
            let value = json!({
                "data": [],
                "total": 1,
                "page_size": bad,
                "current_page": 1,
                "total_pages": 1
            });
            let err = envelope(&value).unwrap_err();
            assert_eq!(
                err,
                EnvelopeError::NotANumber {
                    field: JsonField::PageSize,
                }
            );
            assert_eq!(err.to_string(), "page_size must be a number");
        }
    }

    #[test]
    fn test_decode_items() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Row {
            n: u32,
        }

        let page = envelope(&json!({
            "data": [{"n": 1}, {"n": 2}],
            "total": 2, "page_size": 10, "current_page": 1, "total_pages": 1
        }))
        .unwrap();

        let typed: PagedEnvelope<Row> = page.clone().decode().unwrap();
        assert_eq!(typed.data, vec![Row { n: 1 }, Row { n: 2 }]);
        assert_eq!(typed.total, 2);

        assert!(page.decode::<String>().is_err());
    }

    #[test]
    fn test_serialized_field_order() {
        let page = envelope(&json!({
            "total_pages": 1, "current_page": 1, "page_size": 1, "total": 1, "data": []
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_string(&page).unwrap(),
            r#"{"data":[],"total":1,"page_size":1,"current_page":1,"total_pages":1}"#
        );
    }
}
