//! Authentication methods and the key manager.
//!
//! A journal has one random master key. Each auth method (slot) stores that
//! key wrapped under its own secret, so adding, removing or changing a
//! method never re-encrypts entries.

pub mod keyfile;
pub(crate) mod password;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SecuritySection;
use crate::crypto::{validate_password, KdfParams, SessionKey};
use crate::error::{DiaryError, Result};
use crate::storage::database::NewSlot;
use crate::storage::row::SlotRow;
use crate::storage::Database;

pub use keyfile::KeyFile;

/// Kind of auth slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    Password,
    Keypair,
}

impl AuthKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::Password => "password",
            AuthKind::Keypair => "keypair",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthKind {
    type Err = DiaryError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "password" => Ok(AuthKind::Password),
            "keypair" => Ok(AuthKind::Keypair),
            other => Err(DiaryError::Storage(format!("Unknown auth kind: {}", other))),
        }
    }
}

/// Non-secret description of an auth slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSlotInfo {
    pub id: i64,
    pub kind: AuthKind,
    pub label: String,

    /// age recipient for keypair slots
    pub public_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// Derives, wraps and unwraps the master key for a journal database.
#[derive(Debug, Clone)]
pub struct KeyManager {
    kdf: KdfParams,
    min_password_length: usize,
}

impl KeyManager {
    pub fn new(kdf: KdfParams, min_password_length: usize) -> Self {
        Self {
            kdf,
            min_password_length,
        }
    }

    pub fn from_config(security: &SecuritySection) -> Self {
        Self::new(security.kdf_params(), security.min_password_length)
    }

    /// Create a journal file protected by `password`.
    ///
    /// Generates the master key, wraps it and writes the first slot. The
    /// returned key is the live session key for the new journal.
    pub fn create(&self, path: &Path, password: &str) -> Result<(Database, SessionKey)> {
        validate_password(password, self.min_password_length)?;

        let key = SessionKey::generate()?;
        let secret = password::seal_master(password, &key, &self.kdf)?;
        let db = Database::create(
            path,
            &NewSlot {
                kind: AuthKind::Password,
                label: "Password".to_string(),
                public_key: None,
                kdf_salt: Some(secret.kdf_salt),
                kdf_params: Some(secret.kdf_params),
                verifier: Some(secret.verifier),
                wrapped_key: secret.wrapped_key,
            },
        )?;

        info!("Created diary with password method");
        Ok((db, key))
    }

    /// Unlock with a password.
    ///
    /// # Errors
    ///
    /// `Authentication` for a wrong password, a damaged slot, or a journal
    /// without a password method.
    pub fn unlock_with_password(&self, db: &Database, password: &str) -> Result<SessionKey> {
        let slot = db
            .slot_by_kind(AuthKind::Password)?
            .ok_or(DiaryError::Authentication)?;
        let key = password::open_master(password, &slot)?;
        db.touch_slot(slot.id)?;
        Ok(key)
    }

    /// Unlock with a key file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read; `Authentication` if it is malformed,
    /// unknown to this journal, or fails to unwrap.
    pub fn unlock_with_keyfile(&self, db: &Database, path: &Path) -> Result<SessionKey> {
        let key_file = KeyFile::read(path)?;
        let slot = db
            .slot_by_public_key(&key_file.public_key())?
            .ok_or(DiaryError::Authentication)?;
        let key = key_file.unwrap_master(&slot.wrapped_key)?;
        db.touch_slot(slot.id)?;
        Ok(key)
    }

    /// Add a password method. Only one password method may exist.
    pub fn add_password(&self, db: &mut Database, key: &SessionKey, password: &str) -> Result<AuthSlotInfo> {
        validate_password(password, self.min_password_length)?;
        if db.slot_by_kind(AuthKind::Password)?.is_some() {
            return Err(DiaryError::Policy(
                "A password method already exists".to_string(),
            ));
        }

        let secret = password::seal_master(password, key, &self.kdf)?;
        let id = db.add_slot(&NewSlot {
            kind: AuthKind::Password,
            label: "Password".to_string(),
            public_key: None,
            kdf_salt: Some(secret.kdf_salt),
            kdf_params: Some(secret.kdf_params),
            verifier: Some(secret.verifier),
            wrapped_key: secret.wrapped_key,
        })?;

        info!(slot = id, "Added password method");
        slot_info(db, id)
    }

    /// Add a key-file method.
    ///
    /// If `path` does not exist a new identity is generated and written
    /// there; otherwise the identity already at `path` is registered.
    pub fn add_keyfile(&self, db: &mut Database, key: &SessionKey, path: &Path, label: &str) -> Result<AuthSlotInfo> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DiaryError::InvalidInput("Label cannot be empty".to_string()));
        }

        let key_file = if path.exists() {
            KeyFile::read(path)?
        } else {
            let generated = KeyFile::generate();
            generated.write(path)?;
            generated
        };

        let id = db.add_slot(&NewSlot {
            kind: AuthKind::Keypair,
            label: label.to_string(),
            public_key: Some(key_file.public_key()),
            kdf_salt: None,
            kdf_params: None,
            verifier: None,
            wrapped_key: key_file.wrap_master(key)?,
        })?;

        info!(slot = id, "Added key file method");
        slot_info(db, id)
    }

    /// Remove a method. Refuses to remove the last one.
    pub fn remove_method(&self, db: &mut Database, id: i64) -> Result<()> {
        db.remove_slot(id)?;
        info!(slot = id, "Removed auth method");
        Ok(())
    }

    /// Replace the password, keeping the same master key.
    ///
    /// `old` must unlock the password slot to the same key as the live
    /// session. The slot is rewritten in one transaction, so a failure
    /// leaves the old password working.
    pub fn change_password(&self, db: &mut Database, key: &SessionKey, old: &str, new: &str) -> Result<()> {
        validate_password(new, self.min_password_length)?;
        let slot = self.verified_password_slot(db, key, old)?;

        let secret = password::seal_master(new, key, &self.kdf)?;
        db.replace_password_secret(
            slot.id,
            &secret.kdf_salt,
            &secret.kdf_params,
            &secret.verifier,
            &secret.wrapped_key,
        )?;

        info!(slot = slot.id, "Changed password");
        Ok(())
    }

    /// Check `password` against the password slot without changing anything.
    ///
    /// # Errors
    ///
    /// `NotFound` if the journal has no password method; `Authentication` if
    /// the password is wrong or unwraps to a different key than `key`.
    pub fn verify_password(&self, db: &Database, key: &SessionKey, password: &str) -> Result<()> {
        self.verified_password_slot(db, key, password).map(|_| ())
    }

    fn verified_password_slot(&self, db: &Database, key: &SessionKey, password: &str) -> Result<SlotRow> {
        let slot = db
            .slot_by_kind(AuthKind::Password)?
            .ok_or_else(|| DiaryError::NotFound("Password method".to_string()))?;
        let current = password::open_master(password, &slot)?;
        if !current.matches(key.as_bytes()) {
            return Err(DiaryError::Authentication);
        }
        Ok(slot)
    }

    /// All methods registered on this journal.
    pub fn list_methods(&self, db: &Database) -> Result<Vec<AuthSlotInfo>> {
        db.slots()?.into_iter().map(AuthSlotInfo::try_from).collect()
    }
}

fn slot_info(db: &Database, id: i64) -> Result<AuthSlotInfo> {
    db.slot(id)?
        .ok_or_else(|| DiaryError::NotFound(format!("Auth method {}", id)))?
        .try_into()
}
