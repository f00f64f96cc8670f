//! Tracing setup for Ostende
//!
//! Console output follows the embedding application's chosen level while a
//! full trace of the last run is written to disk. Session failovers are easy
//! to miss at info level, the file keeps every engine event.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Name of the per-run trace file inside the logs directory.
pub const LOG_FILE_NAME: &str = "ostende-last-run.log";

/// Initialize tracing with dual output: console (user level) + file (full trace)
///
/// Returns the path of the trace file, which is overwritten on every run.
///
/// # Errors
///
/// - `std::io::Error` - If the logs directory cannot be created or the log
///   file cannot be opened for writing
/// - `tracing_subscriber::util::TryInitError` - If a global subscriber is
///   already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(LOG_FILE_NAME);
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Tracing initialized: console={}, debug_file={}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// Environment variable overriding the console level.
pub const LOG_LEVEL_ENV: &str = "OSTENDE_LOG";

/// Console level named by `OSTENDE_LOG`, or `fallback` when it is unset or
/// not a level name.
pub fn console_level_from_env(fallback: Level) -> Level {
    parse_console_level(std::env::var(LOG_LEVEL_ENV).ok().as_deref(), fallback)
}

fn parse_console_level(value: Option<&str>, fallback: Level) -> Level {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}
