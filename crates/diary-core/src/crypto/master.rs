//! The session key: the one master key that encrypts every entry.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{DiaryError, Result};

/// Master key length in bytes.
pub const MASTER_KEY_LENGTH: usize = 32;

/// The unwrapped master key of an unlocked journal.
///
/// Not `Clone`: there is exactly one copy per unlocked journal, and it is
/// zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    key: [u8; MASTER_KEY_LENGTH],
}

impl SessionKey {
    /// Generate a new random master key.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; MASTER_KEY_LENGTH];
        getrandom::getrandom(&mut key)
            .map_err(|e| DiaryError::Crypto(format!("Failed to generate master key: {}", e)))?;
        Ok(Self { key })
    }

    /// Take ownership of unwrapped key bytes. The source buffer zeroizes itself.
    pub(crate) fn from_unwrapped(bytes: Zeroizing<[u8; MASTER_KEY_LENGTH]>) -> Self {
        Self { key: *bytes }
    }

    /// Raw key bytes. Use only for immediate encryption operations.
    pub fn as_bytes(&self) -> &[u8; MASTER_KEY_LENGTH] {
        &self.key
    }

    /// Constant-time comparison against other key bytes.
    pub fn matches(&self, other: &[u8; MASTER_KEY_LENGTH]) -> bool {
        blake3::hash(&self.key) == blake3::hash(other)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
