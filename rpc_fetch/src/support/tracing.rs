//! Runtime-adjustable file tracing

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use error_stack::Report;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use super::lazy_file_writer::LazyFileWriter;
use crate::constants::{ENV_LOG_LEVEL, TRACE_LOG_FILE_NAME};
use crate::error::{Error, Result};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(TracingLevel::Warn.as_u8());

/// Targets whose connection-level chatter is always dropped
const SUPPRESSED_TARGETS: [&str; 5] = ["reqwest::", "hyper", "h2::", "rustls::", "want::"];

/// Level filter that can be changed while the process runs
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicFilter;

impl<S> Layer<S> for DynamicFilter
where
    S: Subscriber,
{
    fn enabled(
        &self,
        metadata: &tracing::Metadata<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        let target = metadata.target();
        if SUPPRESSED_TARGETS
            .iter()
            .any(|prefix| target.starts_with(prefix))
        {
            return false;
        }

        TracingLevel::from(*metadata.level()).as_u8() <= CURRENT_LEVEL.load(Ordering::Relaxed)
    }
}

/// Tracing levels that can be set at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingLevel {
    /// Errors only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Request bodies, classification and dispatch details
    Debug,
    /// Everything
    Trace,
}

impl FromStr for TracingLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "Invalid tracing level '{s}'. Valid levels are: error, warn, info, debug, trace"
            )),
        }
    }
}

impl From<Level> for TracingLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }
}

impl TracingLevel {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
            Self::Trace => 4,
        }
    }

    /// Lowercase name of the level
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Level named by `RPC_FETCH_LOG`, if set
    pub fn from_env() -> Result<Option<Self>> {
        std::env::var(ENV_LOG_LEVEL)
            .ok()
            .map(|raw| {
                raw.parse::<Self>().map_err(|e| {
                    Report::new(Error::invalid_config(ENV_LOG_LEVEL, &raw)).attach(e)
                })
            })
            .transpose()
    }
}

/// Install a file subscriber writing to `trace_log_path()`
///
/// The level starts at `RPC_FETCH_LOG` when set, otherwise at the current level. The log
/// file is only created once something is logged.
pub fn init_file_tracing() -> Result<()> {
    if let Some(level) = TracingLevel::from_env()? {
        CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);
    }

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(LazyFileWriter::new(trace_log_path()))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    Registry::default()
        .with(DynamicFilter)
        .with(file_layer)
        .try_init()
        .map_err(|e| Report::new(Error::failed_to("install tracing subscriber", &e)))
}

/// Change the tracing level
pub fn set_tracing_level(level: TracingLevel) {
    CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);
    tracing::info!("Tracing level set to: {}", level.as_str());
}

/// Current tracing level
pub fn get_current_tracing_level() -> TracingLevel {
    match CURRENT_LEVEL.load(Ordering::Relaxed) {
        0 => TracingLevel::Error,
        2 => TracingLevel::Info,
        3 => TracingLevel::Debug,
        4 => TracingLevel::Trace,
        _ => TracingLevel::Warn,
    }
}

/// Path of the trace log file
pub fn trace_log_path() -> PathBuf { std::env::temp_dir().join(TRACE_LOG_FILE_NAME) }
