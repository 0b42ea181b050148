//! The journal database file: schema, metadata and auth slot records.
//!
//! Entry rows are handled by [`crate::storage::UnlockedJournal`]; this type
//! only knows about the file and the tables that are readable while locked.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::auth::AuthKind;
use crate::error::{DiaryError, Result};
use crate::storage::row::{SlotRow, SLOT_COLUMNS};

/// On-disk format version written to `meta`.
pub const FORMAT_VERSION: &str = "1";

/// Metadata keys that must be present in every journal.
pub(crate) const REQUIRED_META_KEYS: &[&str] = &["format_version", "created_at", "last_modified"];

const SCHEMA: &str = r#"
    CREATE TABLE meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE auth_slots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL CHECK (kind IN ('password', 'keypair')),
        label TEXT NOT NULL,
        public_key TEXT UNIQUE,
        kdf_salt BLOB,
        kdf_params TEXT,
        verifier BLOB,
        wrapped_key BLOB NOT NULL,
        created_at TEXT NOT NULL,
        last_used TEXT
    );

    CREATE TABLE entries (
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        nonce BLOB NOT NULL,
        ciphertext BLOB NOT NULL,
        word_count INTEGER NOT NULL DEFAULT 0,
        date_created TEXT NOT NULL,
        date_updated TEXT NOT NULL
    );

    CREATE INDEX idx_entries_date ON entries(date);
"#;

/// A new auth slot to persist.
#[derive(Debug, Clone)]
pub(crate) struct NewSlot {
    pub kind: AuthKind,
    pub label: String,
    pub public_key: Option<String>,
    pub kdf_salt: Option<Vec<u8>>,
    pub kdf_params: Option<String>,
    pub verifier: Option<Vec<u8>>,
    pub wrapped_key: Vec<u8>,
}

/// An open journal database file.
pub struct Database {
    path: PathBuf,
    conn: Connection,
}

impl Database {
    /// Create a new journal file with its first auth slot.
    ///
    /// Schema, metadata and the slot are written in one transaction. If any
    /// step fails the partially created file is removed.
    pub(crate) fn create(path: &Path, first_slot: &NewSlot) -> Result<Self> {
        if path.exists() {
            return Err(DiaryError::Policy("A diary already exists at this location".to_string()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let result = Self::initialize(path, first_slot);
        if result.is_err() {
            let _ = fs::remove_file(path);
        }
        result
    }

    fn initialize(path: &Path, first_slot: &NewSlot) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        Self::configure(&conn)?;

        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('format_version', ?1), ('created_at', ?2), ('last_modified', ?2)",
            params![FORMAT_VERSION, now],
        )?;
        insert_slot(&tx, first_slot)?;
        tx.commit()?;

        crate::fs::set_private_permissions(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    /// Open an existing journal file.
    ///
    /// # Errors
    ///
    /// `NotFound` if the file does not exist, `Integrity` if it is not a
    /// journal of a supported format.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DiaryError::NotFound("Diary file".to_string()));
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;

        let version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'format_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|_| DiaryError::Integrity("Not a diary file".to_string()))?;
        match version.as_deref() {
            Some(FORMAT_VERSION) => {}
            Some(other) => {
                return Err(DiaryError::Integrity(format!(
                    "Unsupported format version {}",
                    other
                )))
            }
            None => return Err(DiaryError::Integrity("Missing format version".to_string())),
        }

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON; PRAGMA secure_delete = ON; PRAGMA temp_store = MEMORY;",
        )?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// All auth slots, oldest first.
    pub(crate) fn slots(&self) -> Result<Vec<SlotRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM auth_slots ORDER BY id ASC",
            SLOT_COLUMNS
        ))?;
        let rows = stmt.query_map([], SlotRow::from_row)?;
        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }

    pub(crate) fn slot(&self, id: i64) -> Result<Option<SlotRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM auth_slots WHERE id = ?1", SLOT_COLUMNS),
                [id],
                SlotRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn slot_by_kind(&self, kind: AuthKind) -> Result<Option<SlotRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM auth_slots WHERE kind = ?1 ORDER BY id ASC LIMIT 1",
                    SLOT_COLUMNS
                ),
                [kind.as_str()],
                SlotRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn slot_by_public_key(&self, public_key: &str) -> Result<Option<SlotRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM auth_slots WHERE public_key = ?1", SLOT_COLUMNS),
                [public_key],
                SlotRow::from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub(crate) fn add_slot(&mut self, slot: &NewSlot) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_slot(&tx, slot)?;
        touch_last_modified(&tx)?;
        tx.commit()?;
        Ok(id)
    }

    /// Delete a slot unless it is the last one. The count and delete run in
    /// one transaction.
    pub(crate) fn remove_slot(&mut self, id: i64) -> Result<()> {
        let tx = self.conn.transaction()?;
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM auth_slots", [], |row| row.get(0))?;
        let exists: Option<i64> = tx
            .query_row("SELECT id FROM auth_slots WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(DiaryError::NotFound(format!("Auth method {}", id)));
        }
        if count <= 1 {
            return Err(DiaryError::Policy(
                "Cannot remove the last authentication method".to_string(),
            ));
        }
        tx.execute("DELETE FROM auth_slots WHERE id = ?1", [id])?;
        touch_last_modified(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the key material of a password slot.
    pub(crate) fn replace_password_secret(
        &mut self,
        id: i64,
        kdf_salt: &[u8],
        kdf_params: &str,
        verifier: &[u8],
        wrapped_key: &[u8],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE auth_slots SET kdf_salt = ?1, kdf_params = ?2, verifier = ?3, wrapped_key = ?4 WHERE id = ?5 AND kind = 'password'",
            params![kdf_salt, kdf_params, verifier, wrapped_key, id],
        )?;
        if updated != 1 {
            return Err(DiaryError::NotFound(format!("Password method {}", id)));
        }
        touch_last_modified(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Record a successful unlock on a slot.
    pub(crate) fn touch_slot(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE auth_slots SET last_used = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    /// Count of metadata keys present out of [`REQUIRED_META_KEYS`].
    pub(crate) fn required_meta_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM meta WHERE key IN ('format_version', 'created_at', 'last_modified')",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn insert_slot(conn: &Connection, slot: &NewSlot) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO auth_slots (
            kind, label, public_key, kdf_salt, kdf_params, verifier, wrapped_key, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            slot.kind.as_str(),
            slot.label,
            slot.public_key,
            slot.kdf_salt,
            slot.kdf_params,
            slot.verifier,
            slot.wrapped_key,
            Utc::now().to_rfc3339(),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DiaryError::Policy("This key is already registered".to_string())
        }
        other => other.into(),
    })?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn touch_last_modified(conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE meta SET value = ?1 WHERE key = 'last_modified'",
        [Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn slot(kind: AuthKind, public_key: Option<&str>) -> NewSlot {
        NewSlot {
            kind,
            label: "test".to_string(),
            public_key: public_key.map(str::to_string),
            kdf_salt: None,
            kdf_params: None,
            verifier: None,
            wrapped_key: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_create_then_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.db");

        let db = Database::create(&path, &slot(AuthKind::Password, None)).unwrap();
        assert_eq!(db.slots().unwrap().len(), 1);
        drop(db);

        let db = Database::open(&path).unwrap();
        assert_eq!(db.required_meta_count().unwrap(), REQUIRED_META_KEYS.len());
        assert!(db.slot_by_kind(AuthKind::Password).unwrap().is_some());
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.db");
        fs::write(&path, b"x").unwrap();

        let result = Database::create(&path, &slot(AuthKind::Password, None));
        assert!(matches!(result, Err(DiaryError::Policy(_))));
        assert_eq!(fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let result = Database::open(&dir.path().join("missing.db"));
        assert!(matches!(result, Err(DiaryError::NotFound(_))));
    }

    #[test]
    fn test_open_foreign_sqlite_is_integrity_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE notes (x TEXT);")
            .unwrap();

        let result = Database::open(&path);
        assert!(matches!(result, Err(DiaryError::Integrity(_))));
    }

    #[test]
    fn test_remove_last_slot_is_policy_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.db");
        let mut db = Database::create(&path, &slot(AuthKind::Password, None)).unwrap();
        let id = db.slots().unwrap()[0].id;

        assert!(matches!(db.remove_slot(id), Err(DiaryError::Policy(_))));
        assert!(matches!(db.remove_slot(999), Err(DiaryError::NotFound(_))));

        let second = db.add_slot(&slot(AuthKind::Keypair, Some("age1abc"))).unwrap();
        db.remove_slot(id).unwrap();
        assert_eq!(db.slots().unwrap()[0].id, second);
    }

    #[test]
    fn test_duplicate_public_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.db");
        let mut db = Database::create(&path, &slot(AuthKind::Password, None)).unwrap();

        db.add_slot(&slot(AuthKind::Keypair, Some("age1abc"))).unwrap();
        let result = db.add_slot(&slot(AuthKind::Keypair, Some("age1abc")));
        assert!(matches!(result, Err(DiaryError::Policy(_))));
    }
}
