//! Typed response values handed back to callers

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::PagedEnvelope;
use super::error_info::{ErrorInfo, StandardError};

/// A successful reply carrying a plain result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResponse<T = Value> {
    /// The server's `result`
    pub result: T,
    /// Correlation id
    pub id:     Option<String>,
}

/// A successful reply carrying one page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse<T = Value> {
    /// Validated page and its metadata
    pub result: PagedEnvelope<T>,
    /// Correlation id
    pub id:     Option<String>,
}

/// A failed call, whatever the cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Normalized error details
    pub error: ErrorInfo,
    /// Correlation id
    pub id:    Option<String>,
}

impl ErrorResponse {
    /// Create an error response
    pub fn new(error: impl Into<ErrorInfo>, id: Option<String>) -> Self {
        Self {
            error: error.into(),
            id:    normalize_id(id),
        }
    }

    /// Create the fixed "Parse error" response
    pub fn parse_error(id: Option<String>) -> Self { Self::new(StandardError::ParseError, id) }

    /// Error code
    pub const fn code(&self) -> i64 { self.error.code }

    /// Error message
    pub fn message(&self) -> &str { &self.error.message }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} [id {id}]", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ErrorResponse {}

/// The three outcomes of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResponse<T = Value> {
    /// Paginated result
    Paged(PagedResponse<T>),
    /// Plain result
    Data(DataResponse<T>),
    /// Any failure
    Error(ErrorResponse),
}

impl<T> RpcResponse<T> {
    /// Correlation id of the response
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Data(response) => response.id.as_deref(),
            Self::Paged(response) => response.id.as_deref(),
            Self::Error(response) => response.id.as_deref(),
        }
    }

    /// Whether this is the error variant
    pub const fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

    /// Error details, when this is the error variant
    pub const fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error(response) => Some(response),
            _ => None,
        }
    }

    /// Narrow to a paged result; a plain data result becomes a "Parse error" response
    pub fn into_paged(self) -> Result<PagedResponse<T>, ErrorResponse> {
        match self {
            Self::Paged(response) => Ok(response),
            Self::Data(response) => Err(ErrorResponse::parse_error(response.id)),
            Self::Error(response) => Err(response),
        }
    }
}

impl RpcResponse<Value> {
    /// Narrow to a plain data result; a page is handed over whole as the `result`
    pub fn into_data(self) -> Result<DataResponse<Value>, ErrorResponse> {
        match self {
            Self::Data(response) => Ok(response),
            Self::Paged(response) => {
                let id = response.id.clone();
                serde_json::to_value(response.result)
                    .map(|result| DataResponse { result, id })
                    .map_err(|e| ErrorResponse::new(ErrorInfo::from_error(&e), response.id))
            }
            Self::Error(response) => Err(response),
        }
    }

    /// Deserialize the result payload into `T`
    ///
    /// A payload that does not fit `T` becomes a "Parse error" response carrying the serde
    /// message, with the id kept.
    pub fn decode<T>(self) -> RpcResponse<T>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Data(DataResponse { result, id }) => match serde_json::from_value(result) {
                Ok(result) => RpcResponse::Data(DataResponse { result, id }),
                Err(e) => RpcResponse::Error(decode_error(&e, id)),
            },
            Self::Paged(PagedResponse { result, id }) => match result.decode() {
                Ok(result) => RpcResponse::Paged(PagedResponse { result, id }),
                Err(e) => RpcResponse::Error(decode_error(&e, id)),
            },
            Self::Error(response) => RpcResponse::Error(response),
        }
    }
}

impl DataResponse<Value> {
    /// Deserialize the result payload into `T`
    pub fn decode<T>(self) -> Result<DataResponse<T>, ErrorResponse>
    where
        T: DeserializeOwned,
    {
        match serde_json::from_value(self.result) {
            Ok(result) => Ok(DataResponse {
                result,
                id: self.id,
            }),
            Err(e) => Err(decode_error(&e, self.id)),
        }
    }
}

impl PagedResponse<Value> {
    /// Deserialize every page item into `T`
    pub fn decode<T>(self) -> Result<PagedResponse<T>, ErrorResponse>
    where
        T: DeserializeOwned,
    {
        match self.result.decode() {
            Ok(result) => Ok(PagedResponse {
                result,
                id: self.id,
            }),
            Err(e) => Err(decode_error(&e, self.id)),
        }
    }
}

fn decode_error(error: &serde_json::Error, id: Option<String>) -> ErrorResponse {
    ErrorResponse::new(
        ErrorInfo {
            message: error.to_string(),
            ..ErrorInfo::from(StandardError::ParseError)
        },
        id,
    )
}

/// Empty ids count as absent
pub(crate) fn normalize_id(id: Option<String>) -> Option<String> { id.filter(|id| !id.is_empty()) }
