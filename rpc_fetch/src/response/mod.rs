//! Response classification, extraction and the typed response values

mod classify;
mod envelope;
mod error_info;
mod extract;
mod types;

pub use classify::{
    FalsyResult, RawResponse, ResponseKind, classify, is_paged_response, is_response,
};
pub use envelope::{EnvelopeError, PagedEnvelope};
pub use error_info::{ErrorInfo, StandardError};
pub use extract::{ExtractOptions, ResponseExtractor};
pub use types::{DataResponse, ErrorResponse, PagedResponse, RpcResponse};
