//! Tracing subscriber setup

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tracing::{Level, debug, info};

/// Log file name inside the log directory
pub const LOG_FILE: &str = "bugwatch.log";

/// Default log directory: `<data_local_dir>/bugwatch/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bugwatch")
        .join("logs")
}

/// Parse a level name case-insensitively; unknown or absent means INFO
pub fn parse_level(level: Option<&str>) -> Level {
    let Some(s) = level else {
        return Level::INFO;
    };
    match s.to_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "INFO" => Level::INFO,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            Level::INFO
        }
    }
}

/// Install a file-backed fmt subscriber; returns the log file path
///
/// `RUST_LOG` directives apply on top of `level`.
pub fn setup_logging(level: Option<&str>, log_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(default_log_dir);
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = parse_level(level);
    let log_path = log_dir.join(LOG_FILE);
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    debug!(?log_path, "setup_logging: done");
    Ok(log_path)
}
