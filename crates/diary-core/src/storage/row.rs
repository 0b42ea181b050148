//! Raw row types for database queries.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::auth::{AuthKind, AuthSlotInfo};
use crate::crypto::{self, KdfParams, SessionKey};
use crate::error::{DiaryError, Result};
use crate::storage::types::{parse_date, DiaryEntry, EntryPayload};

/// Columns selected for every entry query, in `EntryRow::from_row` order.
pub(crate) const ENTRY_COLUMNS: &str =
    "id, date, nonce, ciphertext, word_count, date_created, date_updated";

/// Associated data binding an entry's ciphertext to its id and day.
pub(crate) fn entry_aad(id: &Uuid, date: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(16 + date.len());
    aad.extend_from_slice(id.as_bytes());
    aad.extend_from_slice(date.as_bytes());
    aad
}

/// Raw row data from the entries table, before decryption.
#[derive(Debug)]
pub(crate) struct EntryRow {
    pub id: String,
    pub date: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub word_count: i64,
    pub date_created: String,
    pub date_updated: String,
}

impl EntryRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            nonce: row.get(2)?,
            ciphertext: row.get(3)?,
            word_count: row.get(4)?,
            date_created: row.get(5)?,
            date_updated: row.get(6)?,
        })
    }

    /// Decrypt into a domain entry. Any failure is an `Integrity` error
    /// scoped to this row.
    pub fn decrypt(self, key: &SessionKey) -> Result<DiaryEntry> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DiaryError::Integrity(format!("Invalid entry UUID: {}", e)))?;
        let date = parse_date(&self.date)
            .ok_or_else(|| DiaryError::Integrity(format!("Invalid date on entry {}", id)))?;
        let date_created = parse_timestamp(&self.date_created)?;
        let date_updated = parse_timestamp(&self.date_updated)?;

        let plaintext = crypto::open(
            key.as_bytes(),
            &self.nonce,
            &self.ciphertext,
            &entry_aad(&id, &self.date),
        )
        .map_err(|_| DiaryError::Integrity(format!("Entry {} could not be decrypted", id)))?;
        let mut payload: EntryPayload = serde_json::from_slice(&plaintext)
            .map_err(|_| DiaryError::Integrity(format!("Entry {} payload is malformed", id)))?;

        Ok(DiaryEntry {
            id,
            date,
            title: std::mem::take(&mut payload.title),
            text: std::mem::take(&mut payload.text),
            word_count: u32::try_from(self.word_count).unwrap_or(0),
            date_created,
            date_updated,
        })
    }
}

/// Columns selected for every auth slot query, in `SlotRow::from_row` order.
pub(crate) const SLOT_COLUMNS: &str =
    "id, kind, label, public_key, kdf_salt, kdf_params, verifier, wrapped_key, created_at, last_used";

/// Raw row data from the auth_slots table.
#[derive(Debug, Clone)]
pub(crate) struct SlotRow {
    pub id: i64,
    pub kind: String,
    pub label: String,
    pub public_key: Option<String>,
    pub kdf_salt: Option<Vec<u8>>,
    pub kdf_params: Option<String>,
    pub verifier: Option<Vec<u8>>,
    pub wrapped_key: Vec<u8>,
    pub created_at: String,
    pub last_used: Option<String>,
}

impl SlotRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            label: row.get(2)?,
            public_key: row.get(3)?,
            kdf_salt: row.get(4)?,
            kdf_params: row.get(5)?,
            verifier: row.get(6)?,
            wrapped_key: row.get(7)?,
            created_at: row.get(8)?,
            last_used: row.get(9)?,
        })
    }

    pub fn kind(&self) -> Result<AuthKind> {
        self.kind.parse()
    }

    pub fn kdf_params(&self) -> Option<KdfParams> {
        self.kdf_params
            .as_deref()
            .and_then(|value| serde_json::from_str(value).ok())
    }
}

impl TryFrom<SlotRow> for AuthSlotInfo {
    type Error = DiaryError;

    fn try_from(row: SlotRow) -> Result<Self> {
        let kind = row.kind()?;
        let created_at = parse_timestamp(&row.created_at)?;
        let last_used = row
            .last_used
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(AuthSlotInfo {
            id: row.id,
            kind,
            label: row.label,
            public_key: row.public_key,
            created_at,
            last_used,
        })
    }
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DiaryError::Storage(format!("Invalid timestamp: {}", e)))
}

/// Fixed-width RFC 3339 so stored timestamps sort as text.
pub(crate) fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}
