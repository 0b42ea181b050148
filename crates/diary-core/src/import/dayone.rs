//! Day One JSON export.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use super::{split_title, ImportedEntry};
use crate::error::{DiaryError, Result};

#[derive(Debug, Deserialize)]
struct DayOneDocument {
    entries: Vec<DayOneEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayOneEntry {
    creation_date: String,

    #[serde(default)]
    text: String,

    #[serde(default)]
    time_zone: Option<String>,
}

pub fn parse(contents: &str) -> Result<Vec<ImportedEntry>> {
    let document: DayOneDocument = serde_json::from_str(contents)
        .map_err(|e| DiaryError::Format(format!("Invalid Day One JSON: {}", e)))?;

    document
        .entries
        .into_iter()
        .map(|entry| {
            let created = DateTime::parse_from_rfc3339(entry.creation_date.trim()).map_err(|e| {
                DiaryError::Format(format!("Invalid creationDate '{}': {}", entry.creation_date, e))
            })?;

            // Calendar day as the writer saw it
            let date = match entry.time_zone.as_deref().and_then(|tz| tz.parse::<Tz>().ok()) {
                Some(tz) => created.with_timezone(&tz).date_naive(),
                None => created.date_naive(),
            };

            let (title, text) = split_title(&entry.text);
            Ok(ImportedEntry {
                date,
                title,
                text,
                date_created: Some(created.with_timezone(&Utc)),
            })
        })
        .collect()
}
