//! An unlocked journal: the database file plus its live session key.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};
use uuid::Uuid;

use super::database::{touch_last_modified, Database, REQUIRED_META_KEYS};
use super::row::{entry_aad, format_timestamp, parse_timestamp, EntryRow, ENTRY_COLUMNS};
use super::search;
use super::traits::EntryStore;
use super::types::{format_date, parse_date, DiaryEntry, EntryPayload, NewEntry, SearchHit};
use crate::crypto::{self, SessionKey};
use crate::error::{DiaryError, Result};
use crate::text::count_words;

/// A journal database with its master key.
///
/// Dropping this value zeroizes the key and closes the connection, which
/// also discards the in-memory search index.
pub struct UnlockedJournal {
    db: Database,
    key: SessionKey,
}

impl UnlockedJournal {
    /// Wrap an authenticated database and build its search index.
    pub fn open(db: Database, key: SessionKey) -> Result<Self> {
        search::create_index(db.conn())?;
        let mut journal = Self { db, key };
        journal.rebuild_index()?;
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Database and key together, for auth slot changes.
    pub fn parts_mut(&mut self) -> (&mut Database, &SessionKey) {
        (&mut self.db, &self.key)
    }

    /// Repopulate the search index from every row that decrypts.
    ///
    /// Returns the number of indexed entries. Rows that fail to decrypt are
    /// logged and left out.
    pub fn rebuild_index(&mut self) -> Result<usize> {
        let rows = load_rows(self.db.conn(), "", [])?;
        let total = rows.len();

        let key = &self.key;
        let tx = self.db.conn_mut().transaction()?;
        search::clear_index(&tx)?;
        let mut indexed = 0;
        for row in rows {
            let id = row.id.clone();
            match row.decrypt(key) {
                Ok(entry) => {
                    search::index_entry(&tx, &entry.id, &format_date(entry.date), &entry.title, &entry.text)?;
                    indexed += 1;
                }
                Err(err) => warn!(entry = %id, error = %err, "Skipping undecryptable entry"),
            }
        }
        tx.commit()?;

        debug!(indexed, total, "Rebuilt search index");
        Ok(indexed)
    }

    fn seal_payload(&self, id: &Uuid, date_key: &str, title: &str, text: &str) -> Result<crypto::Sealed> {
        let payload = EntryPayload {
            title: title.to_string(),
            text: text.to_string(),
        };
        let plaintext = zeroize::Zeroizing::new(serde_json::to_vec(&payload)?);
        crypto::seal(self.key.as_bytes(), &plaintext, &entry_aad(id, date_key))
    }

    fn write_new(&mut self, date: NaiveDate, title: &str, text: &str, created: DateTime<Utc>) -> Result<DiaryEntry> {
        let id = Uuid::now_v7();
        let date_key = format_date(date);
        let sealed = self.seal_payload(&id, &date_key, title, text)?;
        let word_count = count_words(text);
        let created = created.trunc_subsecs(6);
        let now = Utc::now().trunc_subsecs(6);

        let tx = self.db.conn_mut().transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO entries ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                ENTRY_COLUMNS
            ),
            params![
                id.to_string(),
                date_key,
                sealed.nonce.to_vec(),
                sealed.ciphertext,
                i64::from(word_count),
                format_timestamp(&created),
                format_timestamp(&now),
            ],
        )?;
        search::index_entry(&tx, &id, &date_key, title, text)?;
        touch_last_modified(&tx)?;
        tx.commit()?;

        Ok(DiaryEntry {
            id,
            date,
            title: title.to_string(),
            text: text.to_string(),
            word_count,
            date_created: created,
            date_updated: now,
        })
    }

    fn row(&self, id: &Uuid) -> Result<Option<EntryRow>> {
        let row = self
            .db
            .conn()
            .query_row(
                &format!("SELECT {} FROM entries WHERE id = ?1", ENTRY_COLUMNS),
                [id.to_string()],
                EntryRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn delete(&mut self, id: &Uuid) -> Result<bool> {
        let tx = self.db.conn_mut().transaction()?;
        let deleted = tx.execute("DELETE FROM entries WHERE id = ?1", [id.to_string()])?;
        search::remove_entry(&tx, id)?;
        if deleted > 0 {
            touch_last_modified(&tx)?;
        }
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn decrypt_all(&self, rows: Vec<EntryRow>) -> Result<Vec<DiaryEntry>> {
        rows.into_iter().map(|row| row.decrypt(&self.key)).collect()
    }
}

impl EntryStore for UnlockedJournal {
    fn create_entry(&mut self, date: NaiveDate) -> Result<DiaryEntry> {
        self.write_new(date, "", "", Utc::now())
    }

    fn insert_entry(&mut self, entry: &NewEntry) -> Result<DiaryEntry> {
        if is_blank(&entry.title, &entry.text) {
            return Err(DiaryError::InvalidInput("Entry is empty".to_string()));
        }
        let created = entry.date_created.unwrap_or_else(Utc::now);
        self.write_new(entry.date, &entry.title, &entry.text, created)
    }

    fn update_entry(
        &mut self,
        id: &Uuid,
        title: &str,
        text: &str,
        date_created: Option<DateTime<Utc>>,
    ) -> Result<Option<DiaryEntry>> {
        let existing = self
            .row(id)?
            .ok_or_else(|| DiaryError::NotFound(format!("Entry {}", id)))?;

        if is_blank(title, text) {
            self.delete(id)?;
            return Ok(None);
        }

        let date = parse_date(&existing.date)
            .ok_or_else(|| DiaryError::Integrity(format!("Invalid date on entry {}", id)))?;
        let created = match date_created {
            Some(created) => created.trunc_subsecs(6),
            None => parse_timestamp(&existing.date_created)?,
        };
        let sealed = self.seal_payload(id, &existing.date, title, text)?;
        let word_count = count_words(text);
        let now = Utc::now().trunc_subsecs(6);

        let tx = self.db.conn_mut().transaction()?;
        tx.execute(
            r#"
            UPDATE entries
            SET nonce = ?1, ciphertext = ?2, word_count = ?3, date_created = ?4, date_updated = ?5
            WHERE id = ?6
            "#,
            params![
                sealed.nonce.to_vec(),
                sealed.ciphertext,
                i64::from(word_count),
                format_timestamp(&created),
                format_timestamp(&now),
                id.to_string(),
            ],
        )?;
        search::index_entry(&tx, id, &existing.date, title, text)?;
        touch_last_modified(&tx)?;
        tx.commit()?;

        Ok(Some(DiaryEntry {
            id: *id,
            date,
            title: title.to_string(),
            text: text.to_string(),
            word_count,
            date_created: created,
            date_updated: now,
        }))
    }

    fn get_entry(&self, id: &Uuid) -> Result<Option<DiaryEntry>> {
        self.row(id)?.map(|row| row.decrypt(&self.key)).transpose()
    }

    fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<DiaryEntry>> {
        let rows = load_rows(
            self.db.conn(),
            "WHERE date = ?1 ORDER BY date_created ASC, id ASC",
            [format_date(date)],
        )?;
        self.decrypt_all(rows)
    }

    fn delete_entry_if_empty(&mut self, id: &Uuid, title: &str, text: &str) -> Result<bool> {
        if !is_blank(title, text) {
            return Ok(false);
        }
        self.delete(id)?;
        Ok(true)
    }

    fn get_all_entry_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        let mut stmt = self.db.conn().prepare("SELECT DISTINCT date FROM entries")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut dates = BTreeSet::new();
        for row in rows {
            let value = row?;
            match parse_date(&value) {
                Some(date) => {
                    dates.insert(date);
                }
                None => warn!("Ignoring entry with invalid date"),
            }
        }
        Ok(dates)
    }

    fn list_entries(&self) -> Result<Vec<DiaryEntry>> {
        let rows = load_rows(
            self.db.conn(),
            "ORDER BY date ASC, date_created ASC, id ASC",
            [],
        )?;
        self.decrypt_all(rows)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        search::search(self.db.conn(), query)
    }

    fn check_integrity(&self) -> Result<()> {
        let rows = load_rows(self.db.conn(), "", [])?;
        let undecryptable = rows
            .into_iter()
            .map(|row| row.decrypt(&self.key))
            .filter(Result::is_err)
            .count();
        if undecryptable > 0 {
            return Err(DiaryError::Integrity(format!(
                "{} entries could not be decrypted",
                undecryptable
            )));
        }

        let (missing, orphaned) = search::consistency(self.db.conn())?;
        if missing > 0 {
            return Err(DiaryError::Integrity(
                "Search index missing entries".to_string(),
            ));
        }
        if orphaned > 0 {
            return Err(DiaryError::Integrity(
                "Search index has orphaned rows".to_string(),
            ));
        }

        if self.db.required_meta_count()? < REQUIRED_META_KEYS.len() {
            return Err(DiaryError::Integrity(
                "Metadata table missing required keys".to_string(),
            ));
        }

        Ok(())
    }
}

fn is_blank(title: &str, text: &str) -> bool {
    title.trim().is_empty() && text.trim().is_empty()
}

fn load_rows<P: rusqlite::Params>(conn: &Connection, clause: &str, params: P) -> Result<Vec<EntryRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM entries {}", ENTRY_COLUMNS, clause))?;
    let rows = stmt.query_map(params, EntryRow::from_row)?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}
