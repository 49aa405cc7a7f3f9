//! Load a JSON file into a colorized, pretty-printed document.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::colorize::colorize_with;
use crate::colors::ColorTheme;
use crate::error::AppError;
use crate::markup;

/// Pretty-printed file content plus its markup rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorizedDocument {
    pub path: PathBuf,
    pub raw_text: String,
    pub marked_up: String,
}

impl ColorizedDocument {
    pub fn from_pretty(path: PathBuf, raw_text: String, theme: &ColorTheme) -> Self {
        let marked_up = colorize_with(&raw_text, theme);
        Self { path, raw_text, marked_up }
    }

    /// File name for pane titles.
    pub fn title(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Text as displayed, with directives removed.
    pub fn visible_text(&self) -> String {
        markup::strip_directives(&self.marked_up)
    }

    pub fn line_count(&self) -> usize {
        self.raw_text.split('\n').count()
    }
}

pub fn read_file(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::Io { path: path.to_path_buf(), source })
}

/// Decode and re-encode with two-space indentation.
///
/// Object keys come out sorted; source key order is not kept.
pub fn pretty_print(path: &Path, contents: &str) -> Result<String, AppError> {
    let value: Value = serde_json::from_str(contents)
        .map_err(|source| AppError::MalformedJson { path: path.to_path_buf(), source })?;
    serde_json::to_string_pretty(&value)
        .map_err(|source| AppError::MalformedJson { path: path.to_path_buf(), source })
}

pub fn load_document(path: &Path, theme: &ColorTheme) -> Result<ColorizedDocument, AppError> {
    let contents = read_file(path)?;
    let pretty = pretty_print(path, &contents)?;
    Ok(ColorizedDocument::from_pretty(path.to_path_buf(), pretty, theme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_and_pretty_prints_with_sorted_keys() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("doc.json");
        fs::write(&path, r#"{"z":1,"a":[true,null]}"#).expect("write");

        let doc = load_document(&path, &ColorTheme::default()).expect("load");
        assert_eq!(doc.raw_text, "{\n  \"a\": [\n    true,\n    null\n  ],\n  \"z\": 1\n}");
        assert_eq!(doc.visible_text(), doc.raw_text);
        assert_eq!(doc.title(), "doc.json");
        assert_eq!(doc.line_count(), 7);
        assert!(doc.marked_up.contains("[blue]\"a\"[-]"));
    }

    #[test]
    fn top_level_arrays_are_accepted() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("list.json");
        fs::write(&path, "[1, \"two\"]").expect("write");
        let doc = load_document(&path, &ColorTheme::default()).expect("load");
        assert!(doc.marked_up.contains("[yellow]1[-]"));
        assert!(doc.marked_up.contains("[green]\"two\"[-]"));
    }

    #[test]
    fn malformed_json_is_reported() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("bad.json");
        fs::write(&path, "{not json").expect("write");
        let err = load_document(&path, &ColorTheme::default()).unwrap_err();
        assert!(matches!(err, AppError::MalformedJson { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = tempdir().expect("tempdir");
        let err = load_document(&temp.path().join("gone.json"), &ColorTheme::default()).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
    }
}
