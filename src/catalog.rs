//! Directory scan for JSON files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::error::AppError;

pub const DEFAULT_WALK_TIMEOUT: Duration = Duration::from_secs(30);
pub const JSON_EXTENSION: &str = "json";

/// One file found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
}

impl CatalogEntry {
    /// Path as shown in the file list: relative to the scan root when possible.
    pub fn display_path(&self, root: &Path) -> String {
        self.path.strip_prefix(root).unwrap_or(&self.path).display().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub timeout: Duration,
    pub cancel: Option<Arc<AtomicBool>>,
    pub follow_links: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { timeout: DEFAULT_WALK_TIMEOUT, cancel: None, follow_links: false }
    }
}

/// Recursively list regular `.json` files under `root`, sorted by file name per
/// directory.
///
/// The deadline and the cancel flag are checked before every visited entry; a
/// scan that stops early returns an error and no partial list.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<Vec<CatalogEntry>, AppError> {
    let started = Instant::now();
    let deadline = started + options.timeout;
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).follow_links(options.follow_links).sort_by_file_name() {
        if options.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            return Err(AppError::Cancelled { root: root.to_path_buf() });
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(AppError::Timeout {
                root: root.to_path_buf(),
                elapsed: now.duration_since(started),
            });
        }

        let entry = entry.map_err(|error| AppError::Walk {
            path: error.path().unwrap_or(root).to_path_buf(),
            message: error.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_json = entry.path().extension().and_then(|ext| ext.to_str()) == Some(JSON_EXTENSION);
        if is_json {
            entries.push(CatalogEntry { path: entry.into_path() });
        }
    }

    Ok(entries)
}
