//! `RpcClient`: fetch a JSON-RPC reply and turn it into an `RpcResponse`

use std::sync::Arc;

use error_stack::Report;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::fetch_options::FetchOptions;
use super::http_client::{ReqwestTransport, Transport, TransportReply};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::notifier::ResponseNotifier;
use crate::response::{
    DataResponse, ErrorInfo, ErrorResponse, ExtractOptions, PagedResponse, ResponseExtractor,
    RpcResponse,
};

/// JSON-RPC client over a pluggable transport
///
/// Owns the `ResponseNotifier` its responses are published to. Clones share the
/// transport and the notifier.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    extractor: ResponseExtractor,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("falsy_result", &self.extractor.falsy_result())
            .field("notifier", self.extractor.notifier())
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Create a client using `reqwest`
    ///
    /// Must be called inside a current-thread tokio runtime.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Create a client sending through `transport`
    pub fn with_transport(
        config: ClientConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        let notifier = ResponseNotifier::new()?;
        Ok(Self {
            transport: Arc::new(transport),
            extractor: ResponseExtractor::new(notifier, config.falsy_result),
        })
    }

    /// The notifier this client publishes to
    pub const fn notifier(&self) -> &ResponseNotifier { self.extractor.notifier() }

    /// Call `callback` with every response published under `id`
    pub fn subscribe<F>(&self, id: impl Into<String>, callback: F)
    where
        F: Fn(&RpcResponse) + Send + Sync + 'static,
    {
        self.notifier().subscribe(id, callback);
    }

    /// Call `callback` with the next response published under `id`
    pub fn subscribe_once<F>(&self, id: impl Into<String>, callback: F)
    where
        F: FnOnce(&RpcResponse) + Send + 'static,
    {
        self.notifier().subscribe_once(id, callback);
    }

    /// Receiver for the next response published under `id`
    pub fn next_response(&self, id: impl Into<String>) -> oneshot::Receiver<RpcResponse> {
        self.notifier().next_response(id)
    }

    /// Extract a response from an already decoded reply
    pub fn extract(&self, raw: &Value, options: &ExtractOptions) -> RpcResponse {
        self.extractor.extract(raw, options)
    }

    /// Send the request and extract the reply
    ///
    /// A transport failure or a body that is not JSON becomes an `ErrorResponse` with
    /// `options.id`; those are never published.
    pub async fn fetch(
        &self,
        url: &str,
        fetch_options: FetchOptions,
        options: &ExtractOptions,
    ) -> RpcResponse {
        if let Some(request_id) = fetch_options.request_id() {
            debug!("Fetching {url} - request id {request_id}");
        } else {
            debug!("Fetching {url}");
        }

        let raw = match self.fetch_json(url, fetch_options).await {
            Ok(raw) => raw,
            Err(report) => {
                warn!("Fetch failed - url={url}, error={}", report.current_context());
                return RpcResponse::Error(ErrorResponse::new(
                    ErrorInfo::from_report(&report),
                    options.id.clone(),
                ));
            }
        };

        self.extract(&raw, options)
    }

    /// Fetch and narrow to a data result
    ///
    /// A page comes back whole as the `result`.
    pub async fn fetch_data<T>(
        &self,
        url: &str,
        fetch_options: FetchOptions,
        options: &ExtractOptions,
    ) -> std::result::Result<DataResponse<T>, ErrorResponse>
    where
        T: DeserializeOwned,
    {
        self.fetch(url, fetch_options, options)
            .await
            .into_data()?
            .decode()
    }

    /// Fetch and narrow to a paged result
    ///
    /// A plain data result becomes a "Parse error" response with the same id.
    pub async fn fetch_paged_data<T>(
        &self,
        url: &str,
        fetch_options: FetchOptions,
        options: &ExtractOptions,
    ) -> std::result::Result<PagedResponse<T>, ErrorResponse>
    where
        T: DeserializeOwned,
    {
        self.fetch(url, fetch_options, options)
            .await
            .into_paged()?
            .decode()
    }

    async fn fetch_json(&self, url: &str, fetch_options: FetchOptions) -> Result<Value> {
        let reply = self.transport.send(url, fetch_options).await?;
        parse_body(url, &reply)
    }
}

/// Decode the reply body as JSON
///
/// The status code is not checked here: servers commonly pair a 4xx/5xx status with a
/// JSON-RPC error body, and that body is what gets extracted.
fn parse_body(url: &str, reply: &TransportReply) -> Result<Value> {
    serde_json::from_slice(&reply.body).map_err(|e| {
        let preview: String = String::from_utf8_lossy(&reply.body).chars().take(200).collect();
        let context = if reply.is_success() {
            Error::JsonRpc(format!("Invalid JSON in response body: {e}"))
        } else {
            Error::Transport(format!("HTTP status {} with non-JSON body", reply.status))
        };
        Report::new(context)
            .attach(format!("URL: {url}"))
            .attach(format!("Body: {preview}"))
    })
}
