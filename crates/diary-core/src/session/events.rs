//! Lock notifications.

use serde::{Deserialize, Serialize};

/// Capacity of the lock event channel. Slow receivers see `Lagged`.
pub(crate) const EVENT_CAPACITY: usize = 16;

/// Why a journal was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    /// `lock_diary` was called
    Manual,

    /// Idle timeout elapsed
    Idle,

    /// The operating system session locked
    System,

    /// Another journal was selected
    Switch,

    /// The journal was removed from the registry
    Removed,

    /// The journal was reset
    Reset,
}

impl LockReason {
    /// Locks the consumer did not ask for, and so must be told about.
    pub fn is_external(&self) -> bool {
        matches!(self, LockReason::Idle | LockReason::System)
    }
}

/// Published on the session's broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryLocked {
    pub reason: LockReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idle_and_system_are_external() {
        assert!(LockReason::Idle.is_external());
        assert!(LockReason::System.is_external());
        assert!(!LockReason::Manual.is_external());
        assert!(!LockReason::Switch.is_external());
        assert!(!LockReason::Removed.is_external());
        assert!(!LockReason::Reset.is_external());
    }

    #[test]
    fn test_event_serializes_reason() {
        let json = serde_json::to_string(&DiaryLocked {
            reason: LockReason::Idle,
        })
        .unwrap();
        assert_eq!(json, r#"{"reason":"idle"}"#);
    }
}
