//! Password policy.

use crate::error::{DiaryError, Result};

/// Default minimum password length in characters.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;

/// Validate a password before any key derivation happens.
///
/// Rejects empty or whitespace-only passwords and anything shorter than
/// `min_length` characters.
///
/// # Examples
///
/// ```
/// use diary_core::crypto::validate_password;
///
/// assert!(validate_password("correct-horse", 8).is_ok());
/// assert!(validate_password("short", 8).is_err());
/// ```
pub fn validate_password(password: &str, min_length: usize) -> Result<()> {
    if password.trim().is_empty() {
        return Err(DiaryError::WeakInput(
            "Password cannot be empty".to_string(),
        ));
    }

    let length = password.chars().count();
    if length < min_length {
        return Err(DiaryError::WeakInput(format!(
            "Password must be at least {} characters (got {})",
            min_length, length
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_password() {
        assert!(validate_password("correct-horse", 8).is_ok());
        assert!(validate_password("longer password with spaces!@#", 8).is_ok());
    }

    #[test]
    fn test_password_too_short() {
        let result = validate_password("short", 8);
        assert!(matches!(result, Err(DiaryError::WeakInput(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("at least 8 characters"));
    }

    #[test]
    fn test_password_empty() {
        assert!(validate_password("", 0).is_err());
        assert!(validate_password("   ", 1).is_err());
        assert!(validate_password("\n\t", 1).is_err());
    }

    #[test]
    fn test_length_counts_characters() {
        // 8 characters, 16 bytes
        assert!(validate_password("ééééé\u{e9}éé", 8).is_ok());
    }
}
