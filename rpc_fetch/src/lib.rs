//! # `rpc_fetch`
//!
//! Client-side helper for calling JSON-RPC style endpoints over HTTP.
//!
//! Every reply is normalized into one of three outcomes: a plain data result, a page of
//! results with its pagination metadata, or an error. Nothing in the normal extraction
//! path fails with an `Err`: malformed payloads, transport failures and server errors all
//! become an `ErrorResponse` value.
//!
//! Finished responses can be published to subscribers keyed by response id through the
//! `ResponseNotifier` each `RpcClient` owns. Clients and notifiers are created inside a
//! current-thread tokio runtime.
//!
//! ```no_run
//! use rpc_fetch::{ClientConfig, ExtractOptions, FetchOptions, RpcClient, RpcRequest};
//!
//! # async fn run() -> rpc_fetch::Result<()> {
//! let client = RpcClient::new(ClientConfig::from_env()?)?;
//! let request = RpcRequest::new("get_balance").with_random_id().param("account", "a-1");
//! let url = "http://localhost:8080/rpc";
//!
//! match client
//!     .fetch_data::<u64>(url, FetchOptions::json(request), &ExtractOptions::new())
//!     .await
//! {
//!     Ok(data) => println!("balance: {}", data.result),
//!     Err(error) => eprintln!("call failed: {error}"),
//! }
//! # Ok(())
//! # }
//! ```

mod config;
pub mod constants;
mod error;
mod json_object;
mod notifier;
mod request;
pub mod response;
mod rpc_client;
pub mod support;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use json_object::{JsonField, JsonObjectAccess, Truthy};
pub use notifier::ResponseNotifier;
pub use request::{BinaryParam, FormField, FormValue, RpcParam, RpcRequest};
pub use response::{
    DataResponse, ErrorInfo, ErrorResponse, ExtractOptions, FalsyResult, PagedEnvelope,
    PagedResponse, ResponseExtractor, ResponseKind, RpcResponse, StandardError, classify,
    is_paged_response, is_response,
};
pub use rpc_client::{
    FetchOptions, HttpMethod, ReqwestTransport, RequestBody, RpcClient, Transport, TransportReply,
};
