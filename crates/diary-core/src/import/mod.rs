//! Import of external journal exports.
//!
//! Every parser maps its source onto [`ImportedEntry`]. Parsing covers the
//! whole file before anything is written, so a malformed file performs zero
//! writes. [`reconcile`] then folds the parsed entries into a store one
//! transaction at a time.

pub mod dayone;
pub mod dayone_txt;
pub mod jrnl;
pub mod merge;
pub mod minidiary;
pub mod reconcile;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DiaryError, Result};

pub use reconcile::{import_entries, reconcile_entry, run_import, Outcome};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportFormat {
    MiniDiaryJson,
    DayOneJson,
    DayOneTxt,
    JrnlJson,
}

impl ImportFormat {
    pub const ALL: [ImportFormat; 4] = [
        ImportFormat::MiniDiaryJson,
        ImportFormat::DayOneJson,
        ImportFormat::DayOneTxt,
        ImportFormat::JrnlJson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportFormat::MiniDiaryJson => "mini-diary-json",
            ImportFormat::DayOneJson => "dayone-json",
            ImportFormat::DayOneTxt => "dayone-txt",
            ImportFormat::JrnlJson => "jrnl-json",
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportFormat {
    type Err = DiaryError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        ImportFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| DiaryError::InvalidInput(format!("Unknown import format: {}", value)))
    }
}

/// An entry parsed from an import source, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedEntry {
    pub date: NaiveDate,
    pub title: String,
    pub text: String,

    /// Original creation time when the source records one
    pub date_created: Option<DateTime<Utc>>,
}

impl ImportedEntry {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.text.trim().is_empty()
    }
}

/// Classification counts for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub entries_imported: usize,
    pub entries_merged: usize,
    pub entries_skipped: usize,
}

impl ImportResult {
    pub fn total(&self) -> usize {
        self.entries_imported + self.entries_merged + self.entries_skipped
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Imported => self.entries_imported += 1,
            Outcome::Merged => self.entries_merged += 1,
            Outcome::Skipped => self.entries_skipped += 1,
        }
    }
}

/// Parse source text in the given format.
pub fn parse_str(contents: &str, format: ImportFormat) -> Result<Vec<ImportedEntry>> {
    match format {
        ImportFormat::MiniDiaryJson => minidiary::parse(contents),
        ImportFormat::DayOneJson => dayone::parse(contents),
        ImportFormat::DayOneTxt => dayone_txt::parse(contents),
        ImportFormat::JrnlJson => jrnl::parse(contents),
    }
}

/// Read and parse an import file.
///
/// # Errors
///
/// `Io` if the file cannot be read, `Format` if it is not valid UTF-8 or
/// does not parse.
pub fn parse_file(path: &Path, format: ImportFormat) -> Result<Vec<ImportedEntry>> {
    let bytes = std::fs::read(path)?;
    let contents = String::from_utf8(bytes)
        .map_err(|_| DiaryError::Format("File is not valid UTF-8".to_string()))?;
    parse_str(contents.trim_start_matches('\u{feff}'), format)
}

/// Split free text into a title and body.
///
/// The title is the first paragraph, otherwise the first line, otherwise
/// the first 100 characters.
pub(crate) fn split_title(content: &str) -> (String, String) {
    const TITLE_CHARS: usize = 100;

    let content = content.trim();
    if let Some(pos) = content.find("\n\n") {
        return (content[..pos].trim().to_string(), content[pos + 2..].trim().to_string());
    }
    if let Some(pos) = content.find('\n') {
        return (content[..pos].trim().to_string(), content[pos + 1..].trim().to_string());
    }
    match content.char_indices().nth(TITLE_CHARS) {
        Some((pos, _)) => (content[..pos].trim().to_string(), content[pos..].trim().to_string()),
        None => (content.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(
            "mini-diary-json".parse::<ImportFormat>().unwrap(),
            ImportFormat::MiniDiaryJson
        );
        assert_eq!(
            " DayOne-TXT ".parse::<ImportFormat>().unwrap(),
            ImportFormat::DayOneTxt
        );
        assert!(matches!(
            "csv".parse::<ImportFormat>(),
            Err(DiaryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_split_title() {
        assert_eq!(
            split_title("Title\n\nBody one\nBody two"),
            ("Title".to_string(), "Body one\nBody two".to_string())
        );
        assert_eq!(
            split_title("Line one\nLine two"),
            ("Line one".to_string(), "Line two".to_string())
        );
        assert_eq!(split_title("  short  "), ("short".to_string(), String::new()));
        assert_eq!(split_title(""), (String::new(), String::new()));
    }

    #[test]
    fn test_split_title_is_char_safe() {
        let content = "é".repeat(150);
        let (title, text) = split_title(&content);
        assert_eq!(title.chars().count(), 100);
        assert_eq!(text.chars().count(), 50);
    }

    #[test]
    fn test_parse_file_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

        assert!(matches!(
            parse_file(&path, ImportFormat::JrnlJson),
            Err(DiaryError::Format(_))
        ));
        assert!(matches!(
            parse_file(&dir.path().join("missing.json"), ImportFormat::JrnlJson),
            Err(DiaryError::Io { .. })
        ));
    }
}
