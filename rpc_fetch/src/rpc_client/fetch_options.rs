//! Per-request HTTP options

use std::time::Duration;

use strum::{AsRefStr, Display};

use crate::request::RpcRequest;

/// HTTP method of the call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    #[default]
    Post,
    /// `PUT`
    Put,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
        }
    }
}

/// Body of the HTTP request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Request serialized as JSON text
    Json(RpcRequest),
    /// Request sent as multipart form fields
    Form(RpcRequest),
    /// Pre-built body
    Raw {
        /// `Content-Type` header value
        content_type: String,
        /// Body bytes
        bytes:        Vec<u8>,
    },
}

/// HTTP options for one fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    /// HTTP method, `POST` by default
    pub method:  HttpMethod,
    /// Extra headers
    pub headers: Vec<(String, String)>,
    /// Request body
    pub body:    Option<RequestBody>,
    /// Overrides the client's request timeout
    pub timeout: Option<Duration>,
}

impl FetchOptions {
    /// `POST` with no body
    pub fn new() -> Self { Self::default() }

    /// `POST` with `request` as JSON
    pub fn json(request: RpcRequest) -> Self {
        Self {
            body: Some(RequestBody::Json(request)),
            ..Self::default()
        }
    }

    /// `POST` with `request` as multipart form fields
    pub fn form(request: RpcRequest) -> Self {
        Self {
            body: Some(RequestBody::Form(request)),
            ..Self::default()
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub const fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Id of the request in the body, if any
    pub fn request_id(&self) -> Option<&str> {
        match &self.body {
            Some(RequestBody::Json(request) | RequestBody::Form(request)) => request.id.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FetchOptions::new();
        assert_eq!(options.method, HttpMethod::Post);
        assert_eq!(options.method.to_string(), "POST");
        assert!(options.body.is_none());
        assert_eq!(options.request_id(), None);
    }

    #[test]
    fn test_request_id() {
        let options = FetchOptions::form(RpcRequest::new("m").with_id("abc"))
            .with_header("X-Trace", "1")
            .with_method(HttpMethod::Put);
        assert_eq!(options.request_id(), Some("abc"));
        assert_eq!(options.headers, vec![("X-Trace".to_string(), "1".to_string())]);
        assert_eq!(reqwest::Method::from(options.method), reqwest::Method::PUT);
    }
}
