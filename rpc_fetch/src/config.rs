//! Client configuration

use std::time::Duration;

use error_stack::Report;

use crate::constants::{
    CONNECTION_TIMEOUT, DEFAULT_REQUEST_TIMEOUT, ENV_CONNECT_TIMEOUT_SECS, ENV_FALSY_RESULT,
    ENV_POOL_IDLE_SECS, ENV_POOL_MAX_IDLE, ENV_TIMEOUT_SECS, ENV_USER_AGENT, POOL_IDLE_TIMEOUT,
    POOL_MAX_IDLE_PER_HOST,
};
use crate::error::{Error, Result};
use crate::response::FalsyResult;

/// Settings for `RpcClient` and its HTTP transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Whole-request timeout
    pub timeout:                Duration,
    /// Connection establishment timeout
    pub connect_timeout:        Duration,
    /// How long idle pooled connections are kept
    pub pool_idle_timeout:      Duration,
    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
    /// `User-Agent` header value
    pub user_agent:             String,
    /// Classification of present-but-falsy results
    pub falsy_result:           FalsyResult,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout:                Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout:        Duration::from_secs(CONNECTION_TIMEOUT),
            pool_idle_timeout:      Duration::from_secs(POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
            user_agent:             default_user_agent(),
            falsy_result:           FalsyResult::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Defaults overridden by `RPC_FETCH_*` environment variables
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Defaults overridden by whatever `lookup` returns for each `RPC_FETCH_*` key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_TIMEOUT_SECS)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_CONNECT_TIMEOUT_SECS)? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_POOL_IDLE_SECS)? {
            config.pool_idle_timeout = Duration::from_secs(secs);
        }
        if let Some(max_idle) = parse_var::<usize>(&lookup, ENV_POOL_MAX_IDLE)? {
            config.pool_max_idle_per_host = max_idle;
        }
        if let Some(user_agent) = lookup(ENV_USER_AGENT).filter(|ua| !ua.trim().is_empty()) {
            config.user_agent = user_agent;
        }
        if let Some(policy) = lookup(ENV_FALSY_RESULT) {
            config.falsy_result = FalsyResult::parse(&policy).ok_or_else(|| {
                Report::new(Error::invalid_config(ENV_FALSY_RESULT, &policy))
                    .attach("Expected one of: data, error")
            })?;
        }

        Ok(config)
    }

    /// Set the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the falsy-result policy
    #[must_use]
    pub const fn with_falsy_result(mut self, falsy_result: FalsyResult) -> Self {
        self.falsy_result = falsy_result;
        self
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim().parse::<T>().map(Some).map_err(|e| {
        Report::new(Error::invalid_config(key, &raw)).attach(format!("Error: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "test assertions")]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(300));
        assert_eq!(config.pool_max_idle_per_host, 12);
        assert!(config.user_agent.starts_with("rpc_fetch/"));
        assert_eq!(config.falsy_result, FalsyResult::Data);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("RPC_FETCH_TIMEOUT_SECS", "10"),
            ("RPC_FETCH_CONNECT_TIMEOUT_SECS", " 2 "),
            ("RPC_FETCH_POOL_IDLE_SECS", "60"),
            ("RPC_FETCH_POOL_MAX_IDLE", "4"),
            ("RPC_FETCH_USER_AGENT", "tests/1.0"),
            ("RPC_FETCH_FALSY_RESULT", "error"),
        ]))
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(60));
        assert_eq!(config.pool_max_idle_per_host, 4);
        assert_eq!(config.user_agent, "tests/1.0");
        assert_eq!(config.falsy_result, FalsyResult::Error);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[("RPC_FETCH_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err.current_context(), Error::Configuration(_)));
        assert!(err.current_context().to_string().contains("RPC_FETCH_TIMEOUT_SECS"));

        let err = ClientConfig::from_lookup(lookup(&[("RPC_FETCH_FALSY_RESULT", "maybe")]))
            .unwrap_err();
        assert!(matches!(err.current_context(), Error::Configuration(_)));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_connect_timeout(Duration::from_millis(100))
            .with_user_agent("custom")
            .with_falsy_result(FalsyResult::Error);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_millis(100));
        assert_eq!(config.user_agent, "custom");
        assert_eq!(config.falsy_result, FalsyResult::Error);
    }
}
