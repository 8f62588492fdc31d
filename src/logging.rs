//! Process-wide logging setup.
//!
//! Installs a console layer on stderr and a non-blocking file layer inside
//! the requested log directory. The default level is WARN; `--verbose`
//! raises it to DEBUG, and `RUST_LOG` overrides both.

use std::fs::OpenOptions;

use camino::Utf8Path;
use thiserror::Error;
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Name of the log file created inside the `--logpath` directory.
pub const LOG_FILE_NAME: &str = "armada.log";

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Raised when the log file cannot be opened for appending.
    #[error("unable to write to log file directory '{directory}': {message}")]
    Unwritable {
        /// Directory passed on the command line.
        directory: String,
        /// Underlying I/O error.
        message: String,
    },
    /// Raised when a global subscriber is already installed.
    #[error("failed to initialise logging: {0}")]
    Init(String),
}

/// Installs the global tracing subscriber.
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process and drop it before exiting.
///
/// # Errors
///
/// Returns [`LoggingError::Unwritable`] when the log directory rejects the
/// log file and [`LoggingError::Init`] when a subscriber is already set.
pub fn init(log_dir: &Utf8Path, verbose: bool) -> Result<WorkerGuard, LoggingError> {
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_std_path())
        .map_err(|err| LoggingError::Unwritable {
            directory: log_dir.to_string(),
            message: err.to_string(),
        })?;
    let (file_writer, guard) = non_blocking(file);

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))?;

    Ok(guard)
}
