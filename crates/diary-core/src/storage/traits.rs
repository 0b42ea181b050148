//! Entry store trait definition.
//!
//! The `EntryStore` trait is the contract between the session layer and an
//! unlocked journal. Every mutation also updates the search index inside
//! the same transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::types::{DiaryEntry, NewEntry, SearchHit};
use crate::error::Result;

/// Encrypted entry storage for one unlocked journal.
///
/// All implementations must ensure:
/// - Entry content is encrypted at rest
/// - A write and its index update commit together or not at all
/// - An entry whose title and text are both blank is never persisted
pub trait EntryStore: Send {
    /// Allocate a new entry with empty title and text.
    fn create_entry(&mut self, date: NaiveDate) -> Result<DiaryEntry>;

    /// Create a complete entry in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `DiaryError::InvalidInput` if both title and text are blank.
    fn insert_entry(&mut self, entry: &NewEntry) -> Result<DiaryEntry>;

    /// Rewrite an entry's content, optionally moving its creation time.
    ///
    /// Blank title and text delete the entry and return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `DiaryError::NotFound` if no entry has this id.
    fn update_entry(
        &mut self,
        id: &Uuid,
        title: &str,
        text: &str,
        date_created: Option<DateTime<Utc>>,
    ) -> Result<Option<DiaryEntry>>;

    /// Save new content for an entry.
    fn save_entry(&mut self, id: &Uuid, title: &str, text: &str) -> Result<Option<DiaryEntry>> {
        self.update_entry(id, title, text, None)
    }

    /// Get an entry by ID.
    ///
    /// Returns `Ok(None)` if not found and `DiaryError::Integrity` if the
    /// row exists but does not decrypt.
    fn get_entry(&self, id: &Uuid) -> Result<Option<DiaryEntry>>;

    /// Entries for one day, ordered by creation time then id.
    fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<DiaryEntry>>;

    /// Delete the entry if `title` and `text` are both blank.
    ///
    /// Returns whether the content was blank. A missing entry is not an
    /// error.
    fn delete_entry_if_empty(&mut self, id: &Uuid, title: &str, text: &str) -> Result<bool>;

    /// Every day that has at least one entry.
    fn get_all_entry_dates(&self) -> Result<BTreeSet<NaiveDate>>;

    /// Every entry, ordered by date then creation time.
    fn list_entries(&self) -> Result<Vec<DiaryEntry>>;

    /// Full-text search over titles and stripped text, best match first.
    fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Check journal integrity.
    ///
    /// Verifies:
    /// - Every entry row decrypts
    /// - The search index has no missing or orphaned records
    /// - Required metadata keys are present
    fn check_integrity(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_dyn_store(_store: &mut dyn EntryStore) {}
    }
}
