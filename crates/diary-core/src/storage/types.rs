//! Core data types for the storage layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Calendar-day format used for entry dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A decrypted diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    /// Stable identifier, unique within a journal
    pub id: Uuid,

    /// Calendar day this entry belongs to
    pub date: NaiveDate,

    /// Title (may be empty)
    pub title: String,

    /// Rich-text markup (may be empty)
    pub text: String,

    /// Word count of `text` with markup stripped
    pub word_count: u32,

    /// When this entry was created
    pub date_created: DateTime<Utc>,

    /// When this entry was last written
    pub date_updated: DateTime<Utc>,
}

impl DiaryEntry {
    /// True when both title and text are empty.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.text.is_empty()
    }
}

/// Builder for inserting a complete entry in one write.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub title: String,
    pub text: String,

    /// Defaults to now
    pub date_created: Option<DateTime<Utc>>,
}

/// The encrypted part of an entry row.
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub(crate) struct EntryPayload {
    pub title: String,
    pub text: String,
}

/// One ranked full-text match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub entry_id: Uuid,
    pub date: NaiveDate,
    pub title: String,

    /// Content excerpt with matches wrapped in `<mark>` tags
    pub snippet: String,
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("01/03/2024"), None);
    }

    #[test]
    fn test_format_date_pads() {
        let date = NaiveDate::from_ymd_opt(987, 1, 2).unwrap();
        assert_eq!(format_date(date), "0987-01-02");
    }
}
