//! Key-file auth method backed by age X25519 identities.
//!
//! The key file is a standard age identity file. The slot stores the
//! matching recipient (`age1...`) and the master key encrypted to it, so the
//! file itself never contains the master key.

use std::fmt::Write as _;
use std::io::{Read, Write};
use std::iter;
use std::path::Path;
use std::str::FromStr;

use age::x25519::{Identity, Recipient};
use chrono::Utc;
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use crate::crypto::master::MASTER_KEY_LENGTH;
use crate::crypto::SessionKey;
use crate::error::{DiaryError, Result};

const SECRET_KEY_PREFIX: &str = "AGE-SECRET-KEY-";

/// An age X25519 identity loaded from or destined for a key file.
pub struct KeyFile {
    identity: Identity,
}

impl KeyFile {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        Self {
            identity: Identity::generate(),
        }
    }

    /// Read an identity file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Authentication` if its contents are
    /// not an age identity.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = Zeroizing::new(std::fs::read(path)?);
        let contents = std::str::from_utf8(&bytes).map_err(|_| DiaryError::Authentication)?;

        let line = contents
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(SECRET_KEY_PREFIX))
            .ok_or(DiaryError::Authentication)?;
        let identity = Identity::from_str(line).map_err(|_| DiaryError::Authentication)?;

        Ok(Self { identity })
    }

    /// Write the identity to `path` with owner-only permissions.
    ///
    /// Refuses to overwrite an existing file.
    pub fn write(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(DiaryError::Policy("Key file already exists".to_string()));
        }

        let secret = self.identity.to_string();
        let mut contents = Zeroizing::new(String::new());
        // Writing into a String cannot fail
        let _ = writeln!(contents, "# created: {}", Utc::now().to_rfc3339());
        let _ = writeln!(contents, "# public key: {}", self.public_key());
        let _ = writeln!(contents, "{}", secret.expose_secret());

        crate::fs::write_atomic(path, contents.as_bytes(), true)?;
        Ok(())
    }

    /// The recipient string (`age1...`) identifying this key.
    pub fn public_key(&self) -> String {
        self.recipient().to_string()
    }

    fn recipient(&self) -> Recipient {
        self.identity.to_public()
    }

    /// Encrypt the master key to this identity's recipient.
    pub(crate) fn wrap_master(&self, key: &SessionKey) -> Result<Vec<u8>> {
        wrap_for_recipient(&self.recipient(), key)
    }

    /// Recover the master key from a slot's wrapped blob.
    ///
    /// Every failure is `Authentication`.
    pub(crate) fn unwrap_master(&self, wrapped: &[u8]) -> Result<SessionKey> {
        let decryptor = age::Decryptor::new(wrapped).map_err(|_| DiaryError::Authentication)?;
        let mut reader = decryptor
            .decrypt(iter::once(&self.identity as &dyn age::Identity))
            .map_err(|_| DiaryError::Authentication)?;

        let mut plaintext = Zeroizing::new(Vec::new());
        reader
            .read_to_end(&mut plaintext)
            .map_err(|_| DiaryError::Authentication)?;
        if plaintext.len() != MASTER_KEY_LENGTH {
            return Err(DiaryError::Authentication);
        }

        let mut bytes = Zeroizing::new([0u8; MASTER_KEY_LENGTH]);
        bytes.copy_from_slice(&plaintext);
        Ok(SessionKey::from_unwrapped(bytes))
    }
}

fn wrap_for_recipient(recipient: &Recipient, key: &SessionKey) -> Result<Vec<u8>> {
    let encryptor = age::Encryptor::with_recipients(iter::once(recipient as &dyn age::Recipient))
        .map_err(|e| DiaryError::Crypto(format!("Failed to create encryptor: {}", e)))?;

    let mut wrapped = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut wrapped)
        .map_err(|e| DiaryError::Crypto(format!("Failed to create encryptor: {}", e)))?;
    writer
        .write_all(key.as_bytes())
        .map_err(|e| DiaryError::Crypto(format!("Encryption write failed: {}", e)))?;
    writer
        .finish()
        .map_err(|e| DiaryError::Crypto(format!("Encryption finish failed: {}", e)))?;

    Ok(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_same_public_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.key");

        let key_file = KeyFile::generate();
        key_file.write(&path).unwrap();
        let loaded = KeyFile::read(&path).unwrap();

        assert_eq!(loaded.public_key(), key_file.public_key());
        assert!(key_file.public_key().starts_with("age1"));
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("diary.key");
        std::fs::write(&path, "existing").unwrap();

        let result = KeyFile::generate().write(&path);
        assert!(matches!(result, Err(DiaryError::Policy(_))));
    }

    #[test]
    fn test_wrap_unwrap_master_key() {
        let key_file = KeyFile::generate();
        let master = SessionKey::generate().unwrap();

        let wrapped = key_file.wrap_master(&master).unwrap();
        let unwrapped = key_file.unwrap_master(&wrapped).unwrap();

        assert!(unwrapped.matches(master.as_bytes()));
    }

    #[test]
    fn test_wrong_identity_is_authentication_error() {
        let master = SessionKey::generate().unwrap();
        let wrapped = KeyFile::generate().wrap_master(&master).unwrap();

        let result = KeyFile::generate().unwrap_master(&wrapped);
        assert!(matches!(result, Err(DiaryError::Authentication)));
    }

    #[test]
    fn test_malformed_file_is_authentication_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.key");
        std::fs::write(&path, "not a key\n").unwrap();

        assert!(matches!(KeyFile::read(&path), Err(DiaryError::Authentication)));

        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(KeyFile::read(&path), Err(DiaryError::Authentication)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = KeyFile::read(&dir.path().join("missing.key"));
        assert!(matches!(result, Err(DiaryError::Io { .. })));
    }
}
