//! Password auth method.
//!
//! A slot holds the Argon2id salt and parameters, the blake3 hash of the
//! verifier half of the derived key, and the master key wrapped under the
//! other half.

use crate::crypto::{self, derive_key, generate_salt, KdfParams, SessionKey};
use crate::error::{DiaryError, Result};
use crate::storage::row::SlotRow;

const SLOT_AAD: &[u8] = b"diary-core/password-slot/v1";

/// Key material for a password slot, ready to persist.
pub(crate) struct PasswordSecret {
    pub kdf_salt: Vec<u8>,
    pub kdf_params: String,
    pub verifier: Vec<u8>,
    pub wrapped_key: Vec<u8>,
}

/// Wrap `key` under `password` with a fresh salt.
pub(crate) fn seal_master(password: &str, key: &SessionKey, params: &KdfParams) -> Result<PasswordSecret> {
    let salt = generate_salt()?;
    let derived = derive_key(password, &salt, params)?;
    let wrapped_key = crypto::wrap_key(derived.wrapping_key(), key.as_bytes(), SLOT_AAD)?;

    Ok(PasswordSecret {
        kdf_salt: salt.to_vec(),
        kdf_params: serde_json::to_string(params)?,
        verifier: derived.verification_hash().as_bytes().to_vec(),
        wrapped_key,
    })
}

/// Recover the master key from a password slot.
///
/// The verifier comparison is constant-time and the unwrap is attempted
/// whether or not it matched, so a wrong password and a damaged slot cost
/// the same and fail the same way.
pub(crate) fn open_master(password: &str, slot: &SlotRow) -> Result<SessionKey> {
    let (Some(params), Some(salt)) = (slot.kdf_params(), slot.kdf_salt.as_deref()) else {
        return Err(DiaryError::Authentication);
    };
    let derived = derive_key(password, salt, &params).map_err(|_| DiaryError::Authentication)?;

    let mut stored = [0u8; 32];
    let stored_ok = match slot.verifier.as_deref() {
        Some(bytes) if bytes.len() == stored.len() => {
            stored.copy_from_slice(bytes);
            true
        }
        _ => false,
    };
    let verified = blake3::Hash::from(stored) == derived.verification_hash();

    let unwrapped = crypto::unwrap_key(derived.wrapping_key(), &slot.wrapped_key, SLOT_AAD);

    match unwrapped {
        Ok(bytes) if stored_ok && verified => Ok(SessionKey::from_unwrapped(bytes)),
        _ => Err(DiaryError::Authentication),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthKind;

    fn slot_from(secret: PasswordSecret) -> SlotRow {
        SlotRow {
            id: 1,
            kind: AuthKind::Password.as_str().to_string(),
            label: "Password".to_string(),
            public_key: None,
            kdf_salt: Some(secret.kdf_salt),
            kdf_params: Some(secret.kdf_params),
            verifier: Some(secret.verifier),
            wrapped_key: secret.wrapped_key,
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_used: None,
        }
    }

    fn fast() -> KdfParams {
        KdfParams::new(1024, 1, 1)
    }

    #[test]
    fn test_seal_then_open() {
        let master = SessionKey::generate().unwrap();
        let slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());

        let opened = open_master("correct-horse", &slot).unwrap();
        assert!(opened.matches(master.as_bytes()));
    }

    #[test]
    fn test_wrong_password_is_authentication_error() {
        let master = SessionKey::generate().unwrap();
        let slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());

        let result = open_master("battery-staple", &slot);
        assert!(matches!(result, Err(DiaryError::Authentication)));
    }

    #[test]
    fn test_corrupted_slot_is_same_error() {
        let master = SessionKey::generate().unwrap();

        let mut slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());
        slot.wrapped_key[30] ^= 0x01;
        assert!(matches!(
            open_master("correct-horse", &slot),
            Err(DiaryError::Authentication)
        ));

        let mut slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());
        slot.verifier = Some(vec![0u8; 32]);
        assert!(matches!(
            open_master("correct-horse", &slot),
            Err(DiaryError::Authentication)
        ));

        let mut slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());
        slot.kdf_params = Some("garbage".to_string());
        assert!(matches!(
            open_master("correct-horse", &slot),
            Err(DiaryError::Authentication)
        ));
    }

    #[test]
    fn test_params_are_persisted_with_slot() {
        let master = SessionKey::generate().unwrap();
        let slot = slot_from(seal_master("correct-horse", &master, &fast()).unwrap());
        assert_eq!(slot.kdf_params(), Some(fast()));
    }
}
