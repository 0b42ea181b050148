//! Storage layer for diary entries.
//!
//! - [`Database`]: the journal file, its metadata and auth slots
//! - [`UnlockedJournal`]: a database paired with its session key, serving
//!   encrypted entry CRUD through [`EntryStore`]
//! - a `temp`-schema FTS5 index kept in step with every write

pub mod database;
pub mod journal;
pub(crate) mod row;
pub(crate) mod search;
pub mod traits;
pub mod types;

pub use database::{Database, FORMAT_VERSION};
pub use journal::UnlockedJournal;
pub use traits::EntryStore;
pub use types::{format_date, parse_date, DiaryEntry, NewEntry, SearchHit, DATE_FORMAT};
