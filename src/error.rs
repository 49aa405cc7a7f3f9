//! Error taxonomy shared by the catalog, loader, search and runtime.

use std::any::Any;
use std::panic::{self, UnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by any operation reachable from a key press.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON in {path}: {source}")]
    MalformedJson { path: PathBuf, source: serde_json::Error },
    #[error("invalid regex pattern {pattern:?}: {source}")]
    InvalidPattern { pattern: String, source: regex::Error },
    #[error("walking {root} timed out after {elapsed:?}")]
    Timeout { root: PathBuf, elapsed: Duration },
    #[error("walking {root} was cancelled")]
    Cancelled { root: PathBuf },
    #[error("error accessing path {path}: {message}")]
    Walk { path: PathBuf, message: String },
    #[error("recovered from panic in {operation}: {message}")]
    Panic { operation: &'static str, message: String },
}

impl AppError {
    /// Short status-line text; details go to the error log.
    pub fn status_message(&self) -> String {
        match self {
            Self::Io { .. } => "Failed to read file. Check error log for details.".to_string(),
            Self::MalformedJson { .. } => "Invalid JSON. Check error log for details.".to_string(),
            Self::InvalidPattern { source, .. } => format!("Invalid regex: {source}"),
            Self::Timeout { .. } | Self::Cancelled { .. } | Self::Walk { .. } => {
                "Failed to load JSON files. Check error log for details.".to_string()
            }
            Self::Panic { message, .. } => format!("Recovered from panic: {message}"),
        }
    }
}

/// Runs `op`, converting a panic into [`AppError::Panic`].
pub fn catch_panic<T>(
    operation: &'static str,
    op: impl FnOnce() -> Result<T, AppError> + UnwindSafe,
) -> Result<T, AppError> {
    match panic::catch_unwind(op) {
        Ok(result) => result,
        Err(payload) => Err(AppError::Panic { operation, message: panic_message(payload.as_ref()) }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_panic_passes_results_through() {
        let value = catch_panic("ok", || Ok::<_, AppError>(7)).unwrap();
        assert_eq!(value, 7);

        let err = catch_panic("err", || -> Result<(), AppError> {
            Err(AppError::Cancelled { root: PathBuf::from(".") })
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Cancelled { .. }));
    }

    #[test]
    fn catch_panic_converts_panics() {
        let err = catch_panic("boom", || -> Result<(), AppError> { panic!("bad file") })
            .unwrap_err();
        match err {
            AppError::Panic { operation, message } => {
                assert_eq!(operation, "boom");
                assert_eq!(message, "bad file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn status_messages_are_short() {
        let err = AppError::Io {
            path: PathBuf::from("a.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.status_message(), "Failed to read file. Check error log for details.");
        let err = AppError::Timeout { root: PathBuf::from("."), elapsed: Duration::from_secs(30) };
        assert!(err.status_message().starts_with("Failed to load JSON files"));
    }
}
