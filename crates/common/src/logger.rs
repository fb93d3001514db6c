use crate::error::ClipsightError;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "clipsight.log";

/// Initialize logging to stderr and to `<log_dir>/clipsight.log`
///
/// Stdout is left untouched so CLI output stays machine-readable.
/// `RUST_LOG` takes precedence over `log_level`.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), ClipsightError> {
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            ClipsightError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            ClipsightError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let env_filter = build_filter(log_level);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(env_filter.clone());

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ClipsightError::config(format!("Failed to install logger: {}", e)))?;

    tracing::debug!(
        "Logging initialized: level={}, log_file={}",
        log_level,
        log_file_path.display()
    );
    Ok(())
}

/// Console-only logging (stderr), for quick runs and tests
pub fn setup_console_logging(log_level: &str) -> Result<(), ClipsightError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(build_filter(log_level))
        .try_init()
        .map_err(|e| ClipsightError::config(format!("Failed to install logger: {}", e)))?;

    Ok(())
}

fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_log_level(log_level).to_string().to_lowercase()))
}

/// Parse string to tracing Level, INFO when unrecognised
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
