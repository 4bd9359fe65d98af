//! Logging setup for mapstack.
//!
//! Structured `tracing` output to a log file (cleared on session start) and
//! optionally to stdout. The filter comes from `RUST_LOG` when set,
//! otherwise `info`, or `debug` when debug mode is requested.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    log_path: PathBuf,
}

impl LoggingGuard {
    /// Path of the log file being written.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

/// Initialize the global subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the log file, created if missing
/// * `log_file` - Log file name
/// * `stdout` - Also print to stdout
/// * `debug` - Default to `debug` level instead of `info`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    stdout: bool,
    debug: bool,
) -> Result<LoggingGuard, io::Error> {
    let log_path = prepare_log_file(log_dir, log_file)?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let stdout_layer = stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
        log_path,
    })
}

/// Create `log_dir` and truncate the log file, returning its path.
pub fn prepare_log_file(log_dir: &Path, log_file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(log_file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Default log directory (~/.mapstack/logs).
pub fn default_log_dir() -> PathBuf {
    crate::config::config_directory().join("logs")
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    crate::config::DEFAULT_LOG_FILE
}
