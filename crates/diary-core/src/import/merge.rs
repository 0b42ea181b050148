//! Merge policy for imported entries.
//!
//! Merging concatenates: titles are joined with [`TITLE_SEPARATOR`] and
//! texts with [`TEXT_SEPARATOR`]. A side that is empty, or already present
//! as a segment of the other, is not repeated. Because a merged entry then
//! contains the imported content as a segment, importing the same file
//! again classifies it as skipped.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ImportedEntry;
use crate::storage::DiaryEntry;

pub const TITLE_SEPARATOR: &str = " | ";
pub const TEXT_SEPARATOR: &str = "\n\n––––––––––\n\n";

/// What to do with one imported entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No entry on that date yet
    Create,

    /// Content is blank or already present
    Skip,

    /// Rewrite `target` with the merged content
    Merge {
        target: Uuid,
        title: String,
        text: String,
        date_created: DateTime<Utc>,
    },
}

/// Classify `imported` against the entries already stored for its date.
///
/// `existing` must be in store order; the first entry is the merge target.
pub fn decide(existing: &[DiaryEntry], imported: &ImportedEntry) -> Decision {
    if imported.is_blank() {
        return Decision::Skip;
    }
    let Some(target) = existing.first() else {
        return Decision::Create;
    };
    if existing.iter().any(|entry| covers(entry, imported)) {
        return Decision::Skip;
    }

    let date_created = match imported.date_created {
        Some(created) if created < target.date_created => created,
        _ => target.date_created,
    };
    Decision::Merge {
        target: target.id,
        title: join(&target.title, &imported.title, TITLE_SEPARATOR),
        text: join(&target.text, &imported.text, TEXT_SEPARATOR),
        date_created,
    }
}

/// Whether `entry` already holds everything `imported` would add.
pub fn covers(entry: &DiaryEntry, imported: &ImportedEntry) -> bool {
    contains_segment(&entry.title, &imported.title, TITLE_SEPARATOR)
        && contains_segment(&entry.text, &imported.text, TEXT_SEPARATOR)
}

/// Join two sides, dropping one that is empty or already contained.
pub fn join(existing: &str, imported: &str, separator: &str) -> String {
    if contains_segment(existing, imported, separator) {
        existing.to_string()
    } else if existing.is_empty() {
        imported.to_string()
    } else {
        format!("{}{}{}", existing, separator, imported)
    }
}

/// True if `needle` is empty, equal to `haystack`, or a run of whole
/// segments of it.
fn contains_segment(haystack: &str, needle: &str, separator: &str) -> bool {
    if needle.is_empty() || haystack == needle {
        return true;
    }
    haystack.starts_with(&format!("{}{}", needle, separator))
        || haystack.ends_with(&format!("{}{}", separator, needle))
        || haystack.contains(&format!("{}{}{}", separator, needle, separator))
}
