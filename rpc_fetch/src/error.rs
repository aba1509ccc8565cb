use thiserror::Error;

// Error message prefixes
const MSG_FAILED_TO_PREFIX: &str = "Failed to";
const MSG_INVALID_PREFIX: &str = "Invalid";

/// Result type for the `rpc_fetch` library
pub type Result<T> = std::result::Result<T, error_stack::Report<Error>>;

/// Errors raised by the crate's own plumbing
///
/// These never describe a JSON-RPC outcome: server errors, malformed payloads and
/// transport failures seen by `RpcClient::fetch` are all turned into an `ErrorResponse`
/// value. This type covers construction and transport internals.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value could not be parsed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A caller supplied an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The reply could not be read as JSON-RPC
    #[error("JSON-RPC error: {0}")]
    JsonRpc(String),

    /// No async runtime was available
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The HTTP exchange failed
    #[error("Transport failed: {0}")]
    Transport(String),
}

impl Error {
    /// Create a "Failed to X" transport error
    pub fn failed_to(action: &str, details: impl std::fmt::Display) -> Self {
        Self::Transport(format!("{MSG_FAILED_TO_PREFIX} {action}: {details}"))
    }

    /// Create an "Invalid X" configuration error
    pub fn invalid_config(what: &str, details: impl std::fmt::Display) -> Self {
        Self::Configuration(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }

    /// Create an "Invalid X" argument error
    pub fn invalid(what: &str, details: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(format!("{MSG_INVALID_PREFIX} {what}: {details}"))
    }
}
