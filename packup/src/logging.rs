//! Tracing subscriber setup.
//!
//! Log level comes from `RUST_LOG` when set, otherwise `info` (or `debug`
//! with `--debug`). Output goes to stderr and, optionally, to a file through
//! a non-blocking writer.

use std::fs;
use std::path::PathBuf;

use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{ManagerError, ManagerResult};

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Lower the default level to `debug`.
    pub debug: bool,
    /// Also log to this file.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn new(debug: bool) -> Self {
        Self { debug, file: None }
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    fn default_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Keeps the file writer flushing. Hold until the process exits.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Calling this twice leaves the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> ManagerResult<LoggingGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| ManagerError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ManagerError::WriteFailed {
                    path: path.clone(),
                    source: e,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(LocalTime::new(Rfc3339))
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    Ok(LoggingGuard { _file: guard })
}
