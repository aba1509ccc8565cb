//! Turning a decoded JSON reply into an `RpcResponse`

use serde_json::Value;
use tracing::{debug, warn};

use super::classify::{FalsyResult, RawResponse};
use super::envelope::PagedEnvelope;
use super::error_info::ErrorInfo;
use super::types::{DataResponse, ErrorResponse, PagedResponse, RpcResponse, normalize_id};
use crate::json_object::{JsonField, JsonObjectAccess, Truthy};
use crate::notifier::ResponseNotifier;

/// Per-call options for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Id used when the reply carries none
    pub id:     Option<String>,
    /// Publish the finished response to subscribers
    pub notify: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            id:     None,
            notify: true,
        }
    }
}

impl ExtractOptions {
    /// Default options: no fallback id, notifications on
    pub fn new() -> Self { Self::default() }

    /// Set the fallback id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = normalize_id(Some(id.into()));
        self
    }

    /// Turn notifications on or off
    #[must_use]
    pub const fn with_notify(mut self, notify: bool) -> Self {
        self.notify = notify;
        self
    }

    fn fallback_id(&self) -> Option<String> { normalize_id(self.id.clone()) }
}

/// Builds typed responses and publishes them to the notifier
#[derive(Clone)]
pub struct ResponseExtractor {
    notifier:     ResponseNotifier,
    falsy_result: FalsyResult,
}

impl ResponseExtractor {
    /// Create an extractor publishing to `notifier`
    ///
    /// `falsy_result` is applied to the notifier too, so its `publish_value` classifies
    /// replies the same way.
    pub const fn new(notifier: ResponseNotifier, falsy_result: FalsyResult) -> Self {
        Self {
            notifier: notifier.with_falsy_result(falsy_result),
            falsy_result,
        }
    }

    /// The notifier responses are published to
    pub const fn notifier(&self) -> &ResponseNotifier { &self.notifier }

    /// Classification policy for present-but-falsy results
    pub const fn falsy_result(&self) -> FalsyResult { self.falsy_result }

    /// Extract a response and, when `options.notify` is set, publish it
    ///
    /// Never fails: malformed input becomes a "Parse error" response, which is returned
    /// without being published.
    pub fn extract(&self, raw: &Value, options: &ExtractOptions) -> RpcResponse {
        let Some(response) = extract_response(raw, options, self.falsy_result) else {
            return RpcResponse::Error(ErrorResponse::parse_error(options.fallback_id()));
        };

        if options.notify {
            self.notifier.publish(&response);
        }

        response
    }
}

/// Build the response for `raw`, or `None` when it is not a response at all
fn extract_response(
    raw: &Value,
    options: &ExtractOptions,
    falsy_result: FalsyResult,
) -> Option<RpcResponse> {
    let Some(decoded) = RawResponse::decode(raw, falsy_result) else {
        warn!("Reply is not a JSON-RPC response: {}", truncate(raw));
        return None;
    };

    debug!("Extracting {} response", decoded.kind());

    let response = match decoded {
        RawResponse::Error { error, id } => RpcResponse::Error(error_response(
            error.unwrap_or(&Value::Null),
            id.or_else(|| options.fallback_id()),
        )),
        RawResponse::Data { result, id } => {
            let id = id.or_else(|| options.fallback_id());
            reject_error(raw, id.as_deref()).unwrap_or_else(|| {
                RpcResponse::Data(DataResponse {
                    result: result.clone(),
                    id,
                })
            })
        }
        RawResponse::Paged { envelope, id } => {
            let id = id.or_else(|| options.fallback_id());
            reject_error(raw, id.as_deref()).unwrap_or_else(|| {
                match PagedEnvelope::from_object(envelope) {
                    Ok(result) => RpcResponse::Paged(PagedResponse { result, id }),
                    Err(e) => {
                        warn!("Invalid paging envelope: {e}");
                        RpcResponse::Error(ErrorResponse::new(ErrorInfo::from_error(&e), id))
                    }
                }
            })
        }
    };

    Some(response)
}

/// Second look at the `error` field before a success value is built
fn reject_error(raw: &Value, id: Option<&str>) -> Option<RpcResponse> {
    raw.get_field(JsonField::Error)
        .filter(|error| error.is_truthy())
        .map(|error| RpcResponse::Error(error_response(error, id.map(str::to_string))))
}

fn error_response(error: &Value, id: Option<String>) -> ErrorResponse {
    let response = ErrorResponse::new(ErrorInfo::from_value(error), id);
    debug!(
        "Server returned error - code={}, message={}",
        response.error.code, response.error.message
    );
    response
}

fn truncate(raw: &Value) -> String { raw.to_string().chars().take(200).collect() }
