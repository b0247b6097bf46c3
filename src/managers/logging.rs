//! Logging manager with file rotation
//!
//! Console output always goes to stderr at INFO. When a log directory is
//! configured, a daily rolling `confluence-backup.log` is written as well.

use crate::config::{expand_tilde, LogSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "confluence-backup";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files; console only when `None`
    pub log_directory: Option<PathBuf>,
    /// Log level for file output (console always uses INFO)
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: Level::INFO,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    pub fn from_settings(settings: &LogSettings) -> Self {
        Self {
            log_directory: settings.directory.clone(),
            log_level: parse_level(&settings.level),
            max_files: settings.max_files,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with console and optional file output
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let (file_layer, file_guard) = match &config.log_directory {
        Some(directory) => {
            let log_dir = expand_tilde(directory);
            fs::create_dir_all(&log_dir)
                .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

            // Create rolling file appender (daily rotation)
            let file_appender = RollingFileAppender::new(
                Rotation::DAILY,
                &log_dir,
                format!("{}.log", LOG_FILE_PREFIX),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No colors in file
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_span_events(FmtSpan::NONE)
                .with_filter(level_filter(config.log_level));

            cleanup_old_logs(&log_dir, config.max_files)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    // Console layer: INFO level, concise format
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(Level::INFO));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

/// Run `f` with a temporary stderr subscriber at INFO
///
/// Used while the configuration is loaded, before `init_logging` can run.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_level(true)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Create a level filter for tracing layers
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("confluence_backup={}", level))
            .add_directive(LevelFilter::from_level(level).into())
    })
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name.contains(".log")
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
