//! HTTP transport for JSON-RPC calls
//!
//! `Transport` is the seam between `RpcClient` and the network. `ReqwestTransport` is the
//! production implementation; tests and embedders can supply their own.

use async_trait::async_trait;
use error_stack::Report;
use reqwest::Client;
use tracing::{debug, warn};

use super::fetch_options::{FetchOptions, RequestBody};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Raw HTTP reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body:   Vec<u8>,
}

impl TransportReply {
    /// Whether the status is in the 2xx range
    pub const fn is_success(&self) -> bool { self.status >= 200 && self.status < 300 }
}

/// Sends one HTTP request and returns the reply
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request described by `options` against `url`
    async fn send(&self, url: &str, options: FetchOptions) -> Result<TransportReply>;
}

/// `reqwest`-backed transport with connection pooling
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                Report::new(Error::failed_to("build HTTP client", &e))
                    .attach(format!("Config: {config:?}"))
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client
    pub const fn from_client(client: Client) -> Self { Self { client } }

    fn build_request(&self, url: &str, options: FetchOptions) -> Result<reqwest::RequestBuilder> {
        let mut request = self.client.request(options.method.into(), url);

        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        request = match options.body {
            Some(RequestBody::Json(rpc_request)) => {
                let body = rpc_request.to_string();
                debug!("Request body - {body}");
                request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body)
            }
            Some(RequestBody::Form(rpc_request)) => {
                debug!("Form request - {rpc_request}");
                request.multipart(rpc_request.to_multipart()?)
            }
            Some(RequestBody::Raw {
                content_type,
                bytes,
            }) => request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes),
            None => request,
        };

        Ok(request)
    }

    /// Wrap a `reqwest` failure with what kind of failure it was
    fn handle_error(e: &reqwest::Error, url: &str, method: &str) -> Report<Error> {
        warn!("HTTP request failed - url={url}, error={e}");

        let error_type = if e.is_timeout() {
            "Timeout"
        } else if e.is_connect() {
            "Connection failed"
        } else if e.is_request() {
            "Request error"
        } else if e.is_body() {
            "Body error"
        } else if e.is_decode() {
            "Decode error"
        } else {
            "Unknown error type"
        };

        Report::new(Error::Transport(format!(
            "HTTP request failed - {error_type}: {e}"
        )))
        .attach(format!("Method: {method}, URL: {url}"))
        .attach(format!("Full error: {e:?}"))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: FetchOptions) -> Result<TransportReply> {
        let method = options.method.to_string();
        let request = self.build_request(url, options)?;

        let response = request
            .send()
            .await
            .map_err(|e| Self::handle_error(&e, url, &method))?;

        let status = response.status();
        if !status.is_success() {
            debug!("HTTP status {status} from {url}, reading body anyway");
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::handle_error(&e, url, &method))?;

        Ok(TransportReply {
            status: status.as_u16(),
            body:   body.to_vec(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use serde_json::{Value, json};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::request::RpcRequest;

    /// Serve one HTTP exchange and hand back the raw request text
    async fn serve_once(
        reply_status: &'static str,
        reply_body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/rpc", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0_u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                if request_complete(&received) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {reply_status}\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{reply_body}",
                reply_body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });

        (url, server)
    }

    fn request_complete(received: &[u8]) -> bool {
        let text = String::from_utf8_lossy(received);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        received.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let (url, server) = serve_once("200 OK", r#"{"jsonrpc":"2.0","id":"1","result":7}"#).await;
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();

        let options = FetchOptions::json(RpcRequest::new("add").with_id("1").param("a", 3))
            .with_header("X-Test", "yes");
        let reply = transport.send(&url, options).await.unwrap();

        assert!(reply.is_success());
        let body: Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(body, json!({"jsonrpc": "2.0", "id": "1", "result": 7}));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /rpc"));
        assert!(request.to_ascii_lowercase().contains("x-test: yes"));
        assert!(request.contains(r#"{"jsonrpc":"2.0","id":"1","method":"add","params":{"a":3}}"#));
    }

    #[tokio::test]
    async fn test_error_status_keeps_body() {
        let (url, server) = serve_once(
            "500 Internal Server Error",
            r#"{"error":{"code":-32603,"message":"Internal error"}}"#,
        )
        .await;
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();

        let reply = transport.send(&url, FetchOptions::new()).await.unwrap();
        assert_eq!(reply.status, 500);
        assert!(!reply.is_success());
        assert!(String::from_utf8_lossy(&reply.body).contains("Internal error"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/rpc", listener.local_addr().unwrap());
        drop(listener);

        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let err = transport.send(&url, FetchOptions::new()).await.unwrap_err();
        assert!(matches!(err.current_context(), Error::Transport(_)));
    }
}
