//! Logging setup for restpager.
//!
//! Logs go to `restpager.log` in the log directory, cleared at startup. The
//! TUI owns the terminal, so stderr output is only added for `--once`.
//! The filter is taken from `RUST_LOG` and defaults to `info`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "restpager.log";

/// Keeps the background log writer alive.
///
/// Dropping this guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Default log directory: `logs` under the user cache directory
pub fn default_log_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "restpager").map(|dirs| dirs.cache_dir().join("logs"))
}

/// Creates `log_dir` if needed and truncates the log file in it.
///
/// # Returns
/// Path of the (now empty) log file
pub fn prepare_log_file(log_dir: &Path) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

/// Installs the global tracing subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the log file
/// * `also_stderr` - Mirror log lines to stderr
///
/// # Errors
///
/// Returns an error if the log file cannot be prepared or a subscriber is
/// already installed
pub fn init_logging(log_dir: &Path, also_stderr: bool) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    let stderr_layer = also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
