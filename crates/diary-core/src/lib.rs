//! # Diary Core
//!
//! Core library for an encrypted, local-first diary.
//!
//! Every entry is sealed with a random master key. The master key is stored
//! only wrapped, once per authentication method (a password or an age key
//! file). Nothing readable ever reaches the journal file; the full-text
//! index lives in memory for the length of an unlocked session.
//!
//! ## Architecture
//!
//! - **auth**: key manager and authentication slots
//! - **crypto**: Argon2id, XChaCha20-Poly1305 and the session key
//! - **storage**: journal database, encrypted entry store, search index
//! - **import**: Mini Diary, Day One and jrnl parsers plus the merge policy
//! - **registry**: named journals and the active selection
//! - **session**: the state machine, idle auto-lock and lock events
//! - **export**, **backup**, **stats**, **navigation**: everything around it

pub mod auth;
pub mod backup;
pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub(crate) mod fs;
pub mod import;
pub mod navigation;
pub mod registry;
pub mod session;
pub mod stats;
pub mod storage;
pub mod text;

pub use auth::{AuthKind, AuthSlotInfo, KeyManager};
pub use config::DiaryConfig;
pub use error::{DiaryError, Result};
pub use export::{ExportFormat, ExportResult};
pub use import::{ImportFormat, ImportResult};
pub use registry::{JournalConfig, JournalRegistry};
pub use session::{DiaryLocked, LockReason, SessionController, SessionState};
pub use storage::{DiaryEntry, EntryStore, SearchHit};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
