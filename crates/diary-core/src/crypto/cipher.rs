//! Authenticated encryption with XChaCha20-Poly1305.
//!
//! Key: 32 bytes. Nonce: 24 random bytes per call. Tag: 16 bytes.
//! Wrapped keys use the wire format `[ nonce (24) | ciphertext + tag ]`.

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::error::{DiaryError, Result};

/// Nonce length for XChaCha20-Poly1305.
pub const NONCE_LENGTH: usize = 24;

/// Ciphertext and the nonce it was sealed under.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| DiaryError::Crypto("Invalid cipher key".to_string()))?;
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|_| DiaryError::Crypto("Encryption failed".to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    nonce_bytes.copy_from_slice(&nonce);
    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt and authenticate. Any failure is an `Integrity` error.
pub fn open(key: &[u8; 32], nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_LENGTH {
        return Err(DiaryError::Integrity("Invalid nonce length".to_string()));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| DiaryError::Crypto("Invalid cipher key".to_string()))?;

    let plaintext = cipher
        .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| DiaryError::Integrity("Authentication tag mismatch".to_string()))?;

    Ok(Zeroizing::new(plaintext))
}

/// Wrap a 32-byte key for storage (nonce prepended).
pub fn wrap_key(wrapping_key: &[u8; 32], key: &[u8; 32], aad: &[u8]) -> Result<Vec<u8>> {
    let sealed = seal(wrapping_key, key, aad)?;
    let mut out = Vec::with_capacity(NONCE_LENGTH + sealed.ciphertext.len());
    out.extend_from_slice(&sealed.nonce);
    out.extend_from_slice(&sealed.ciphertext);
    Ok(out)
}

/// Unwrap a key produced by [`wrap_key`].
pub fn unwrap_key(wrapping_key: &[u8; 32], wrapped: &[u8], aad: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    if wrapped.len() < NONCE_LENGTH {
        return Err(DiaryError::Integrity("Wrapped key too short".to_string()));
    }
    let (nonce, ciphertext) = wrapped.split_at(NONCE_LENGTH);
    let plaintext = open(wrapping_key, nonce, ciphertext, aad)?;
    if plaintext.len() != 32 {
        return Err(DiaryError::Integrity("Unwrapped key has wrong length".to_string()));
    }
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&plaintext);
    Ok(out)
}
