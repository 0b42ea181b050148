//! Mini Diary JSON.
//!
//! Two shapes are accepted:
//! - the array form written by [`crate::export`], with `metadata.version`
//!   set to `"1.0"`
//! - the classic map form keyed by date, as written by the Mini Diary
//!   desktop app

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ImportedEntry;
use crate::error::{DiaryError, Result};
use crate::storage::parse_date;

/// Versions of the array form this parser understands.
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Array-form document, shared with the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniDiaryDocument {
    pub metadata: Metadata,
    pub entries: Vec<MiniDiaryEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniDiaryEntry {
    pub date: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub word_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    metadata: Metadata,
    entries: RawEntries,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntries {
    List(Vec<MiniDiaryEntry>),
    Map(BTreeMap<String, ClassicEntry>),
}

#[derive(Debug, Deserialize)]
struct ClassicEntry {
    #[serde(default)]
    title: String,

    #[serde(default)]
    text: String,
}

pub fn parse(contents: &str) -> Result<Vec<ImportedEntry>> {
    let document: RawDocument = serde_json::from_str(contents)
        .map_err(|e| DiaryError::Format(format!("Invalid Mini Diary JSON: {}", e)))?;

    match document.entries {
        RawEntries::List(entries) => {
            let version = document.metadata.version.as_str();
            if !SUPPORTED_VERSIONS.contains(&version) {
                return Err(DiaryError::Format(format!(
                    "Unsupported Mini Diary version '{}'",
                    version
                )));
            }
            entries
                .into_iter()
                .map(|entry| {
                    Ok(ImportedEntry {
                        date: checked_date(&entry.date)?,
                        title: entry.title,
                        text: entry.text,
                        date_created: entry.date_created.as_deref().and_then(parse_timestamp),
                    })
                })
                .collect()
        }
        RawEntries::Map(entries) => entries
            .into_iter()
            .map(|(date, entry)| {
                Ok(ImportedEntry {
                    date: checked_date(&date)?,
                    title: entry.title,
                    text: entry.text,
                    date_created: None,
                })
            })
            .collect(),
    }
}

fn checked_date(value: &str) -> Result<chrono::NaiveDate> {
    parse_date(value).ok_or_else(|| {
        DiaryError::Format(format!("Invalid date '{}', expected YYYY-MM-DD", value))
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_array_form() {
        let json = r#"{
            "metadata": { "version": "1.0", "entry_count": 2 },
            "entries": [
                {
                    "date": "2024-01-01",
                    "title": "First Entry",
                    "text": "<p>This is my first entry.</p>",
                    "date_created": "2024-01-01T12:00:00Z"
                },
                { "date": "2024-01-02", "title": "Second", "text": "" }
            ]
        }"#;

        let entries = parse(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(entries[0].title, "First Entry");
        assert_eq!(
            entries[0].date_created.unwrap().to_rfc3339(),
            "2024-01-01T12:00:00+00:00"
        );
        assert_eq!(entries[1].date_created, None);
    }

    #[test]
    fn test_parse_classic_map_form() {
        let json = r#"{
            "metadata": { "application": "Mini Diary", "version": "3.3.0" },
            "entries": {
                "2020-05-02": { "dateUpdated": "Sat May 02 2020", "title": "B", "text": "two" },
                "2020-05-01": { "title": "A", "text": "one" }
            }
        }"#;

        let entries = parse(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "A");
        assert_eq!(entries[1].text, "two");
    }

    #[test]
    fn test_unsupported_version() {
        let json = r#"{ "metadata": { "version": "2.0" }, "entries": [] }"#;
        assert!(matches!(parse(json), Err(DiaryError::Format(_))));
    }

    #[test]
    fn test_invalid_date() {
        let json = r#"{
            "metadata": { "version": "1.0" },
            "entries": [ { "date": "2024-13-01", "title": "x", "text": "" } ]
        }"#;
        assert!(matches!(parse(json), Err(DiaryError::Format(_))));

        let json = r#"{ "metadata": { "version": "1.0" }, "entries": [ { "title": "x" } ] }"#;
        assert!(matches!(parse(json), Err(DiaryError::Format(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse("{ not json"), Err(DiaryError::Format(_))));
    }
}
