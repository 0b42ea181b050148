//! jrnl JSON export (`jrnl --export json`).

use chrono::{Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use super::ImportedEntry;
use crate::error::{DiaryError, Result};
use crate::storage::parse_date;

#[derive(Debug, Deserialize)]
struct JrnlDocument {
    entries: Vec<JrnlEntry>,
}

#[derive(Debug, Deserialize)]
struct JrnlEntry {
    #[serde(default)]
    title: String,

    #[serde(default)]
    body: String,

    date: String,

    /// `HH:MM`
    #[serde(default)]
    time: Option<String>,
}

pub fn parse(contents: &str) -> Result<Vec<ImportedEntry>> {
    let document: JrnlDocument = serde_json::from_str(contents)
        .map_err(|e| DiaryError::Format(format!("Invalid jrnl JSON: {}", e)))?;

    document
        .entries
        .into_iter()
        .map(|entry| {
            let date = valid_date(&entry.date)?;
            let date_created = entry
                .time
                .as_deref()
                .and_then(|time| NaiveTime::parse_from_str(time.trim(), "%H:%M").ok())
                .map(|time| Utc.from_utc_datetime(&date.and_time(time)));

            Ok(ImportedEntry {
                date,
                title: entry.title,
                text: entry.body,
                date_created,
            })
        })
        .collect()
}

fn valid_date(value: &str) -> Result<NaiveDate> {
    match parse_date(value) {
        Some(date) if date.year() >= 1000 => Ok(date),
        _ => Err(DiaryError::Format(format!(
            "Invalid jrnl date '{}', expected YYYY-MM-DD",
            value
        ))),
    }
}
