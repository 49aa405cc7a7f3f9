//! Durable log streams.
//!
//! `info.log` receives everything at INFO and above (`RUST_LOG` may change the
//! level), `error.log` receives ERROR events only. Both files are appended to
//! and opened once per process. The terminal is never written to, since the TUI
//! owns it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

pub const INFO_LOG: &str = "info.log";
pub const ERROR_LOG: &str = "error.log";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("failed to open log file in {path}: {source}")]
    Open { path: PathBuf, source: InitError },
    #[error("failed to install logger: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Keeps the background log writers alive; dropping it flushes both files.
#[must_use]
pub struct LogGuards {
    pub dir: PathBuf,
    _info: WorkerGuard,
    _error: WorkerGuard,
}

fn appender(dir: &Path, name: &str) -> Result<RollingFileAppender, LogError> {
    let (prefix, suffix) = name.rsplit_once('.').unwrap_or((name, "log"));
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix(suffix)
        .build(dir)
        .map_err(|source| LogError::Open { path: dir.to_path_buf(), source })
}

/// Build the two-stream subscriber without installing it.
pub fn subscriber(dir: &Path) -> Result<(impl Subscriber + Send + Sync, LogGuards), LogError> {
    fs::create_dir_all(dir)
        .map_err(|source| LogError::CreateDir { path: dir.to_path_buf(), source })?;

    let (info_writer, info_guard) = tracing_appender::non_blocking(appender(dir, INFO_LOG)?);
    let (error_writer, error_guard) = tracing_appender::non_blocking(appender(dir, ERROR_LOG)?);

    let info_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let info_layer = fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(info_writer)
        .with_filter(info_filter);
    let error_layer = fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(error_writer)
        .with_filter(LevelFilter::ERROR);

    let subscriber = tracing_subscriber::registry().with(info_layer).with(error_layer);
    let guards = LogGuards { dir: dir.to_path_buf(), _info: info_guard, _error: error_guard };
    Ok((subscriber, guards))
}

/// Install the durable logs as the process-wide subscriber.
pub fn init(dir: &Path) -> Result<LogGuards, LogError> {
    let (subscriber, guards) = subscriber(dir)?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guards)
}
