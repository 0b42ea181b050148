//! Session lifecycle: which journal is selected, whether it is unlocked,
//! and when it locks itself.

pub mod controller;
pub mod events;
pub(crate) mod idle;
pub mod state;

pub use controller::SessionController;
pub use events::{DiaryLocked, LockReason};
pub use state::{transition, SessionEvent, SessionState};
