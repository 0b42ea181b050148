//! Error types for diary core operations.
//!
//! Errors carry descriptive detail for logs and tests. Anything that
//! crosses into a user interface goes through [`DiaryError::user_message`],
//! which maps every variant to a fixed string without paths, OS codes or
//! SQLite identifiers.

use thiserror::Error;

use crate::import::ImportResult;

/// Result type alias for diary operations.
pub type Result<T> = std::result::Result<T, DiaryError>;

/// Core error type for diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// Bad credential. Deliberately carries no detail.
    #[error("Authentication failed")]
    Authentication,

    /// Operation would violate an invariant (e.g. removing the last auth method)
    #[error("Not permitted: {0}")]
    Policy(String),

    /// Referenced entry, journal or auth slot is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation requires an unlocked diary
    #[error("Diary is locked")]
    Locked,

    /// Decryption or verification failed on existing data
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Import source could not be parsed
    #[error("Format error: {0}")]
    Format(String),

    /// Password rejected before any key derivation
    #[error("Weak password: {0}")]
    WeakInput(String),

    /// Invalid user input (dates, names, paths)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A conflicting operation is already running
    #[error("Busy: {0}")]
    Busy(String),

    /// Import stopped on request; counts cover what was committed
    #[error("Import cancelled after {} entries", .0.total())]
    Cancelled(ImportResult),

    /// Configuration or registry file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption primitive failure (not a credential mismatch)
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Database {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl DiaryError {
    /// Fixed, user-safe message for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            DiaryError::Authentication => "Incorrect password or key file",
            DiaryError::Policy(_) => "This action is not allowed",
            DiaryError::NotFound(_) => "The requested item could not be found",
            DiaryError::Locked => "The diary is locked",
            DiaryError::Integrity(_) => "Some diary data could not be decrypted",
            DiaryError::Format(_) => "The import file could not be read",
            DiaryError::WeakInput(_) => "The password does not meet the requirements",
            DiaryError::InvalidInput(_) => "The input is invalid",
            DiaryError::Busy(_) => "Another operation is in progress",
            DiaryError::Cancelled(_) => "The import was cancelled",
            DiaryError::Config(_) => "The configuration could not be loaded",
            DiaryError::Crypto(_) => "An encryption error occurred",
            DiaryError::Storage(_) | DiaryError::Database { .. } => "A storage error occurred",
            DiaryError::Io { .. } => "A file could not be read or written",
            DiaryError::Json { .. } => "Data could not be serialized",
        }
    }
}
