//! Session state machine.
//!
//! [`transition`] is pure. The controller applies its result and performs
//! the side effects (key scrub, timer, events).

use serde::{Deserialize, Serialize};

use super::events::LockReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// Loading the journal registry
    Checking,

    /// No journal selected yet, or a switch is in progress
    JournalSelect,

    /// Selected journal has no database file
    NoDiary,

    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    RegistryLoaded,
    JournalSelected { exists: bool },
    Created,
    Unlocked,
    Locked(LockReason),
    SwitchJournal,
    Reset,
}

/// Next state, or `None` if `event` is not allowed in `state`.
pub fn transition(state: SessionState, event: SessionEvent) -> Option<SessionState> {
    use SessionEvent as E;
    use SessionState as S;

    match (state, event) {
        (_, E::SwitchJournal) => Some(S::JournalSelect),
        (S::Checking, E::RegistryLoaded) => Some(S::JournalSelect),
        (S::JournalSelect, E::JournalSelected { exists: true }) => Some(S::Locked),
        (S::JournalSelect, E::JournalSelected { exists: false }) => Some(S::NoDiary),
        (S::NoDiary, E::Created) => Some(S::Unlocked),
        (S::Locked, E::Unlocked) => Some(S::Unlocked),
        (S::Unlocked, E::Locked(_)) => Some(S::Locked),
        (S::Locked | S::Unlocked, E::Reset) => Some(S::NoDiary),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = transition(SessionState::Checking, SessionEvent::RegistryLoaded).unwrap();
        assert_eq!(state, SessionState::JournalSelect);

        let state = transition(state, SessionEvent::JournalSelected { exists: false }).unwrap();
        assert_eq!(state, SessionState::NoDiary);

        let state = transition(state, SessionEvent::Created).unwrap();
        assert_eq!(state, SessionState::Unlocked);

        let state = transition(state, SessionEvent::Locked(LockReason::Idle)).unwrap();
        assert_eq!(state, SessionState::Locked);

        let state = transition(state, SessionEvent::Unlocked).unwrap();
        assert_eq!(state, SessionState::Unlocked);
    }

    #[test]
    fn test_switch_from_any_state() {
        for state in [
            SessionState::Checking,
            SessionState::JournalSelect,
            SessionState::NoDiary,
            SessionState::Locked,
            SessionState::Unlocked,
        ] {
            assert_eq!(
                transition(state, SessionEvent::SwitchJournal),
                Some(SessionState::JournalSelect)
            );
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert_eq!(transition(SessionState::Locked, SessionEvent::Created), None);
        assert_eq!(transition(SessionState::NoDiary, SessionEvent::Unlocked), None);
        assert_eq!(transition(SessionState::Unlocked, SessionEvent::Unlocked), None);
        assert_eq!(
            transition(SessionState::Locked, SessionEvent::Locked(LockReason::Manual)),
            None
        );
        assert_eq!(transition(SessionState::NoDiary, SessionEvent::Reset), None);
        assert_eq!(
            transition(SessionState::Checking, SessionEvent::JournalSelected { exists: true }),
            None
        );
    }

    #[test]
    fn test_reset_returns_to_no_diary() {
        assert_eq!(
            transition(SessionState::Unlocked, SessionEvent::Reset),
            Some(SessionState::NoDiary)
        );
        assert_eq!(
            transition(SessionState::Locked, SessionEvent::Reset),
            Some(SessionState::NoDiary)
        );
    }
}
