//! Export to JSON or markdown.
//!
//! JSON uses the Mini Diary array form and re-imports through
//! [`crate::import::minidiary`] without loss. Markdown is for reading.

pub mod markdown;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DiaryError, Result};
use crate::import::minidiary::{Metadata, MiniDiaryDocument, MiniDiaryEntry};
use crate::storage::row::format_timestamp;
use crate::storage::{format_date, DiaryEntry};

pub use markdown::{export_markdown, html_to_markdown, to_markdown};

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = DiaryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(DiaryError::InvalidInput(format!("Unknown export format: {}", value))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResult {
    pub entries_exported: usize,
    pub file_path: PathBuf,
}

/// Serialize entries to pretty JSON.
pub fn to_json(entries: &[DiaryEntry]) -> Result<String> {
    let document = MiniDiaryDocument {
        metadata: Metadata {
            version: "1.0".to_string(),
            application: Some(format!("diary {}", crate::VERSION)),
            exported_at: Some(format_timestamp(&Utc::now())),
            entry_count: Some(entries.len()),
        },
        entries: entries
            .iter()
            .map(|entry| MiniDiaryEntry {
                date: format_date(entry.date),
                title: entry.title.clone(),
                text: entry.text.clone(),
                word_count: entry.word_count,
                date_created: Some(format_timestamp(&entry.date_created)),
                date_updated: Some(format_timestamp(&entry.date_updated)),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write entries to `path` atomically with owner-only permissions.
pub fn export_json(entries: &[DiaryEntry], path: &Path) -> Result<ExportResult> {
    let json = zeroize::Zeroizing::new(to_json(entries)?);
    crate::fs::write_atomic(path, json.as_bytes(), true)?;

    info!(entries = entries.len(), "Exported journal");
    Ok(ExportResult {
        entries_exported: entries.len(),
        file_path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::minidiary;
    use chrono::{SubsecRound, TimeZone};
    use uuid::Uuid;

    fn entry(date: &str, title: &str, text: &str) -> DiaryEntry {
        DiaryEntry {
            id: Uuid::now_v7(),
            date: crate::storage::parse_date(date).unwrap(),
            title: title.to_string(),
            text: text.to_string(),
            word_count: crate::text::count_words(text),
            date_created: Utc.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap(),
            date_updated: Utc::now().trunc_subsecs(6),
        }
    }

    #[test]
    fn test_export_parses_back() {
        let entries = vec![
            entry("2024-01-01", "First", "<p>one</p>"),
            entry("2024-01-01", "Second", ""),
            entry("2024-02-10", "", "<p>three words here</p>"),
        ];

        let json = to_json(&entries).unwrap();
        let parsed = minidiary::parse(&json).unwrap();

        assert_eq!(parsed.len(), 3);
        for (original, parsed) in entries.iter().zip(&parsed) {
            assert_eq!(parsed.date, original.date);
            assert_eq!(parsed.title, original.title);
            assert_eq!(parsed.text, original.text);
            assert_eq!(parsed.date_created, Some(original.date_created));
        }
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(" MD ".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(DiaryError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_export_json_writes_private_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let result = export_json(&[entry("2024-01-01", "x", "")], &path).unwrap();
        assert_eq!(result.entries_exported, 1);
        assert_eq!(result.file_path, path);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
