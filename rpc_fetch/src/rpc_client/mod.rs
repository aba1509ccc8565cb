//! HTTP fetch wrapper around the response extractor

mod client;
mod fetch_options;
mod http_client;

pub use client::RpcClient;
pub use fetch_options::{FetchOptions, HttpMethod, RequestBody};
pub use http_client::{ReqwestTransport, Transport, TransportReply};
