//! Cryptographic primitives for the diary.
//!
//! - **Argon2id**: memory-hard password key derivation
//! - **XChaCha20-Poly1305**: per-entry and per-slot authenticated encryption
//! - **age (X25519)**: key-file auth slots, see [`crate::auth::keyfile`]
//!
//! ## Security Model
//!
//! - A random master key encrypts every entry
//! - The master key is stored only wrapped, once per auth method
//! - Key material is zeroized from memory on drop
//!
//! We do NOT defend against a compromised OS or access to an unlocked
//! session's memory.

pub mod cipher;
pub mod kdf;
pub mod master;
pub mod password;

pub use cipher::{open, seal, unwrap_key, wrap_key, Sealed};
pub use kdf::{derive_key, generate_salt, DerivedKey, KdfParams};
pub use master::SessionKey;
pub use password::validate_password;
