//! Password key derivation using Argon2id.
//!
//! One derivation yields two independent 32-byte halves: a wrapping key
//! for the master key and a verifier whose hash is stored in the slot.

use argon2::Argon2;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{DiaryError, Result};

/// Default Argon2id memory cost: 64 MB (64 * 1024 KB).
pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
/// Default Argon2id iterations.
pub const DEFAULT_ITERATIONS: u32 = 3;
/// Default Argon2id lanes.
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Salt length stored per password slot.
pub const SALT_LENGTH: usize = 16;

const HALF_LENGTH: usize = 32;
const OUTPUT_LENGTH: usize = HALF_LENGTH * 2;

/// Argon2id cost parameters. Stored alongside each password slot so that
/// changing the configured defaults never locks out an existing diary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS, DEFAULT_PARALLELISM)
    }
}

/// Key material derived from a password.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    wrapping: [u8; HALF_LENGTH],
    verifier: [u8; HALF_LENGTH],
}

impl DerivedKey {
    /// Key used to wrap and unwrap the master key.
    pub fn wrapping_key(&self) -> &[u8; HALF_LENGTH] {
        &self.wrapping
    }

    /// Hash of the verifier half, the only part that is persisted.
    pub fn verification_hash(&self) -> blake3::Hash {
        blake3::hash(&self.verifier)
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("wrapping", &"[REDACTED]")
            .field("verifier", &"[REDACTED]")
            .finish()
    }
}

/// Derive key material from a password using Argon2id.
///
/// Same password, salt and params always produce the same key.
///
/// # Errors
///
/// Returns `InvalidInput` for a short salt and `Crypto` when Argon2 rejects
/// the parameters.
pub fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    if salt.len() < SALT_LENGTH {
        return Err(DiaryError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            SALT_LENGTH
        )));
    }

    let argon_params = argon2::Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(OUTPUT_LENGTH),
    )
    .map_err(|e| DiaryError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = [0u8; OUTPUT_LENGTH];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|e| DiaryError::Crypto(format!("Key derivation failed: {}", e)))?;

    let mut key = DerivedKey {
        wrapping: [0u8; HALF_LENGTH],
        verifier: [0u8; HALF_LENGTH],
    };
    key.wrapping.copy_from_slice(&output[..HALF_LENGTH]);
    key.verifier.copy_from_slice(&output[HALF_LENGTH..]);
    output.zeroize();

    Ok(key)
}

/// Fresh random salt for a new password slot.
pub fn generate_salt() -> Result<[u8; SALT_LENGTH]> {
    let mut salt = [0u8; SALT_LENGTH];
    getrandom::getrandom(&mut salt)
        .map_err(|e| DiaryError::Crypto(format!("Failed to generate salt: {}", e)))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::new(1024, 1, 1)
    }

    #[test]
    fn test_key_derivation_deterministic() {
        let salt = b"unique-salt-1234567890123456";

        let key1 = derive_key("test-password", salt, &fast()).unwrap();
        let key2 = derive_key("test-password", salt, &fast()).unwrap();

        assert_eq!(key1.wrapping_key(), key2.wrapping_key());
        assert_eq!(key1.verification_hash(), key2.verification_hash());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("test-password", b"salt1-1234567890123456", &fast()).unwrap();
        let key2 = derive_key("test-password", b"salt2-1234567890123456", &fast()).unwrap();

        assert_ne!(key1.wrapping_key(), key2.wrapping_key());
    }

    #[test]
    fn test_halves_are_independent() {
        let key = derive_key("test-password", b"salt-1234567890123456", &fast()).unwrap();
        assert_ne!(
            key.wrapping_key().as_slice(),
            key.verification_hash().as_bytes().as_slice()
        );
    }

    #[test]
    fn test_short_salt_rejected() {
        let result = derive_key("test-password", b"short", &fast());
        assert!(matches!(result, Err(DiaryError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = derive_key("pw", b"salt-1234567890123456", &KdfParams::new(1, 1, 1));
        assert!(matches!(result, Err(DiaryError::Crypto(_))));
    }

    #[test]
    fn test_derived_key_debug_redacts() {
        let key = derive_key("test-password", b"salt-1234567890123456", &fast()).unwrap();
        let debug_output = format!("{:?}", key);

        assert!(debug_output.contains("REDACTED"));
        let key_hex = hex::encode(&key.wrapping_key()[..4]);
        assert!(!debug_output.contains(&key_hex));
    }
}
