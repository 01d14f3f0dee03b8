//! Structured logging.
//!
//! Events go to stderr and, when a log file is configured, are appended to
//! that file as well (no ANSI colours). The `RUST_LOG` environment variable
//! overrides the configured level.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ObservabilityConfig;

/// Error type for logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("opening log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: tracing_appender::rolling::InitError,
    },
    #[error("installing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Flushes the file writer when dropped; keep it alive for the whole run.
#[must_use = "Dropping this guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "vanity={level},tower_http={level}",
                level = config.log_level
            ))
        })
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    if config.log_file.is_empty() {
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
        return Ok(LoggingGuard { _file_guard: None });
    }

    let path = Path::new(&config.log_file);
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vanity.log".to_string());

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|source| LoggingError::File {
            path: config.log_file.clone(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(LoggingGuard {
        _file_guard: Some(guard),
    })
}
