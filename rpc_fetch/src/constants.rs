//! Protocol constants and client defaults

/// JSON-RPC protocol version written into every request
pub const JSON_RPC_VERSION: &str = "2.0";

// JSON-RPC 2.0 reserved error codes
/// Invalid JSON was received
pub const JSON_RPC_ERROR_PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object
pub const JSON_RPC_ERROR_INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available
pub const JSON_RPC_ERROR_METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters
pub const JSON_RPC_ERROR_INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error
pub const JSON_RPC_ERROR_INTERNAL_ERROR: i64 = -32603;

/// Request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Connection timeout in seconds
pub const CONNECTION_TIMEOUT: u64 = 5;

/// Idle timeout for connection pool in seconds
pub const POOL_IDLE_TIMEOUT: u64 = 300;

/// Maximum idle connections per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 12;

/// Placeholder form field sent when a request has no params
pub(crate) const EMPTY_PARAMS_FORM_KEY: &str = "value";
pub(crate) const EMPTY_PARAMS_FORM_VALUE: &str = "1";

// Environment variables read by `ClientConfig::from_env`
pub(crate) const ENV_TIMEOUT_SECS: &str = "RPC_FETCH_TIMEOUT_SECS";
pub(crate) const ENV_CONNECT_TIMEOUT_SECS: &str = "RPC_FETCH_CONNECT_TIMEOUT_SECS";
pub(crate) const ENV_POOL_IDLE_SECS: &str = "RPC_FETCH_POOL_IDLE_SECS";
pub(crate) const ENV_POOL_MAX_IDLE: &str = "RPC_FETCH_POOL_MAX_IDLE";
pub(crate) const ENV_USER_AGENT: &str = "RPC_FETCH_USER_AGENT";
pub(crate) const ENV_FALSY_RESULT: &str = "RPC_FETCH_FALSY_RESULT";
pub(crate) const ENV_LOG_LEVEL: &str = "RPC_FETCH_LOG";

/// File name of the trace log written by `init_file_tracing`
pub(crate) const TRACE_LOG_FILE_NAME: &str = "rpc_fetch_trace.log";
