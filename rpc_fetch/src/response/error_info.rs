//! Normalized error payload carried by every `ErrorResponse`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumIter};

use crate::constants::{
    JSON_RPC_ERROR_INTERNAL_ERROR, JSON_RPC_ERROR_INVALID_PARAMS, JSON_RPC_ERROR_INVALID_REQUEST,
    JSON_RPC_ERROR_METHOD_NOT_FOUND, JSON_RPC_ERROR_PARSE_ERROR,
};
use crate::error::Error;
use crate::json_object::{JsonField, JsonObjectAccess, Truthy};

/// The reserved JSON-RPC 2.0 error descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum StandardError {
    /// Invalid JSON was received
    ParseError,
    /// The JSON sent is not a valid request object
    InvalidRequest,
    /// The method does not exist or is not available
    MethodNotFound,
    /// Invalid method parameters
    InvalidParams,
    /// Internal JSON-RPC error
    InternalError,
}

impl StandardError {
    /// Numeric error code
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => JSON_RPC_ERROR_PARSE_ERROR,
            Self::InvalidRequest => JSON_RPC_ERROR_INVALID_REQUEST,
            Self::MethodNotFound => JSON_RPC_ERROR_METHOD_NOT_FOUND,
            Self::InvalidParams => JSON_RPC_ERROR_INVALID_PARAMS,
            Self::InternalError => JSON_RPC_ERROR_INTERNAL_ERROR,
        }
    }

    /// Canonical message text
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }

    /// Look up the descriptor for a reserved code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            JSON_RPC_ERROR_PARSE_ERROR => Some(Self::ParseError),
            JSON_RPC_ERROR_INVALID_REQUEST => Some(Self::InvalidRequest),
            JSON_RPC_ERROR_METHOD_NOT_FOUND => Some(Self::MethodNotFound),
            JSON_RPC_ERROR_INVALID_PARAMS => Some(Self::InvalidParams),
            JSON_RPC_ERROR_INTERNAL_ERROR => Some(Self::InternalError),
            _ => None,
        }
    }
}

/// Error information in the uniform `{code, message, data}` shape
///
/// Every constructor succeeds: missing pieces fall back to code `0`, an empty message and
/// an empty `data` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error code, `0` when the source carried none
    pub code:    i64,
    /// Human readable message
    pub message: String,
    /// Arbitrary error details
    pub data:    Value,
}

impl Default for ErrorInfo {
    fn default() -> Self {
        Self {
            code:    0,
            message: String::new(),
            data:    empty_data(),
        }
    }
}

fn empty_data() -> Value { Value::Object(Map::new()) }

impl ErrorInfo {
    /// Build from a structured wire error `{code?, message?, data?}`
    ///
    /// A bare JSON string is read as the message. Anything else that is not an object
    /// produces the defaults.
    pub fn from_value(value: &Value) -> Self {
        if let Some(message) = value.as_str() {
            return Self::from(message);
        }

        let code = value
            .get_truthy_field(JsonField::Code)
            .and_then(integer_code)
            .unwrap_or(0);

        let message = value
            .get_truthy_field(JsonField::Message)
            .map(|message| match message {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        let data = value
            .get_truthy_field(JsonField::Data)
            .cloned()
            .unwrap_or_else(empty_data);

        Self {
            code,
            message,
            data,
        }
    }

    /// Build from a native error
    ///
    /// The message is the error's display text and `data` describes the error itself,
    /// including its source chain when it has one.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let message = error.to_string();

        let mut sources = Vec::new();
        let mut source = error.source();
        while let Some(inner) = source {
            sources.push(Value::String(inner.to_string()));
            source = inner.source();
        }

        let mut data = Map::new();
        data.insert(String::from(JsonField::Message), Value::String(message.clone()));
        if !sources.is_empty() {
            data.insert("sources".to_string(), Value::Array(sources));
        }

        Self {
            code: 0,
            message,
            data: Value::Object(data),
        }
    }

    /// Build from one of this crate's error reports
    ///
    /// `data.report` keeps the full rendering with every attachment.
    pub fn from_report(report: &error_stack::Report<Error>) -> Self {
        let message = report.current_context().to_string();
        Self {
            code: 0,
            data: json!({
                "message": message,
                "report": format!("{report:?}"),
            }),
            message,
        }
    }

    /// The reserved descriptor matching this code, if any
    pub fn standard_error(&self) -> Option<StandardError> { StandardError::from_code(self.code) }
}

/// Integer codes may arrive as integral floats; anything else counts as missing
#[allow(clippy::cast_possible_truncation, reason = "only integral floats reach the cast")]
fn integer_code(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

impl From<&str> for ErrorInfo {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Self::default()
        }
    }
}

impl From<String> for ErrorInfo {
    fn from(message: String) -> Self {
        Self {
            message,
            ..Self::default()
        }
    }
}

impl From<&Value> for ErrorInfo {
    fn from(value: &Value) -> Self { Self::from_value(value) }
}

impl From<StandardError> for ErrorInfo {
    fn from(descriptor: StandardError) -> Self {
        Self {
            code:    descriptor.code(),
            message: descriptor.message().to_string(),
            data:    empty_data(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (error {})", self.message, self.code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_structured_error_defaults() {
        let info = ErrorInfo::from_value(&json!({}));
        assert_eq!(info.code, 0);
        assert_eq!(info.message, "");
        assert_eq!(info.data, json!({}));
    }

    #[test]
    fn test_structured_error_passthrough() {
        let info = ErrorInfo::from_value(&json!({
            "code": 4001,
            "message": "Insufficient funds",
            "data": {"balance": 3}
        }));
        assert_eq!(info.code, 4001);
        assert_eq!(info.message, "Insufficient funds");
        assert_eq!(info.data, json!({"balance": 3}));
    }

    #[test]
    fn test_structured_error_falsy_fields_use_defaults() {
        let info = ErrorInfo::from_value(&json!({"code": 0, "message": "", "data": null}));
        assert_eq!(info, ErrorInfo::default());

        let info = ErrorInfo::from_value(&json!({"code": -32000.0, "message": 42}));
        assert_eq!(info.code, -32000);
        assert_eq!(info.message, "42");
    }

    #[test]
    fn test_string_error() {
        let info = ErrorInfo::from_value(&json!("something broke"));
        assert_eq!(info.code, 0);
        assert_eq!(info.message, "something broke");
        assert_eq!(info.data, json!({}));

        assert_eq!(ErrorInfo::from("boom"), ErrorInfo::from("boom".to_string()));
    }

    #[test]
    fn test_non_object_error_uses_defaults() {
        assert_eq!(ErrorInfo::from_value(&json!(5)), ErrorInfo::default());
        assert_eq!(ErrorInfo::from_value(&json!(null)), ErrorInfo::default());
        assert_eq!(ErrorInfo::from_value(&json!([1])), ErrorInfo::default());
    }

    #[test]
    fn test_native_error() {
        let parse_failure = serde_json::from_str::<Value>("{not json").unwrap_err();
        let info = ErrorInfo::from_error(&parse_failure);
        assert_eq!(info.code, 0);
        assert_eq!(info.message, parse_failure.to_string());
        assert_eq!(info.data["message"], json!(parse_failure.to_string()));
        assert!(info.data.get("sources").is_none());
    }

    #[test]
    fn test_report_error() {
        let report = error_stack::Report::new(Error::Transport("connection refused".to_string()))
            .attach("URL: http://localhost:1");
        let info = ErrorInfo::from_report(&report);
        assert_eq!(info.message, "Transport failed: connection refused");
        assert!(
            info.data["report"]
                .as_str()
                .is_some_and(|report| report.contains("URL: http://localhost:1"))
        );
    }

    #[test]
    fn test_standard_descriptors() {
        let table: Vec<(i64, &str)> = StandardError::iter()
            .map(|descriptor| (descriptor.code(), descriptor.message()))
            .collect();
        assert_eq!(
            table,
            vec![
                (-32700, "Parse error"),
                (-32600, "Invalid Request"),
                (-32601, "Method not found"),
                (-32602, "Invalid params"),
                (-32603, "Internal error"),
            ]
        );

        for descriptor in StandardError::iter() {
            let info = ErrorInfo::from(descriptor);
            assert_eq!(info.standard_error(), Some(descriptor));
            assert_eq!(info.data, json!({}));
        }
        assert_eq!(StandardError::from_code(-32000), None);
    }

    #[test]
    fn test_display() {
        let info = ErrorInfo::from(StandardError::MethodNotFound);
        assert_eq!(info.to_string(), "Method not found (error -32601)");
    }
}
