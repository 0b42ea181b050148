//! Applying parsed entries to a store.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use super::merge::{decide, Decision};
use super::{ImportResult, ImportedEntry};
use crate::error::{DiaryError, Result};
use crate::storage::{EntryStore, NewEntry};

/// How one imported entry was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Imported,
    Merged,
    Skipped,
}

/// Reconcile a single entry. All writes for it happen in one transaction.
pub fn reconcile_entry(store: &mut dyn EntryStore, entry: &ImportedEntry) -> Result<Outcome> {
    let existing = store.get_entries_for_date(entry.date)?;

    match decide(&existing, entry) {
        Decision::Skip => Ok(Outcome::Skipped),
        Decision::Create => {
            store.insert_entry(&NewEntry {
                date: entry.date,
                title: entry.title.clone(),
                text: entry.text.clone(),
                date_created: entry.date_created,
            })?;
            Ok(Outcome::Imported)
        }
        Decision::Merge {
            target,
            title,
            text,
            date_created,
        } => {
            store.update_entry(&target, &title, &text, Some(date_created))?;
            Ok(Outcome::Merged)
        }
    }
}

/// Drive `apply` over every entry, honouring cancellation between entries.
///
/// `progress` receives `(done, total)` after each entry.
///
/// # Errors
///
/// `Cancelled` with the counts committed so far if `cancel` is set, or the
/// first error returned by `apply`.
pub fn run_import<F>(
    entries: &[ImportedEntry],
    cancel: Option<&AtomicBool>,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
    mut apply: F,
) -> Result<ImportResult>
where
    F: FnMut(&ImportedEntry) -> Result<Outcome>,
{
    let total = entries.len();
    let mut result = ImportResult::default();

    for (index, entry) in entries.iter().enumerate() {
        if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
            info!(committed = result.total(), total, "Import cancelled");
            return Err(DiaryError::Cancelled(result));
        }

        result.record(apply(entry)?);

        if let Some(report) = progress.as_mut() {
            report(index + 1, total);
        }
    }

    info!(
        imported = result.entries_imported,
        merged = result.entries_merged,
        skipped = result.entries_skipped,
        "Import finished"
    );
    Ok(result)
}

/// Reconcile every entry into `store`.
pub fn import_entries(
    store: &mut dyn EntryStore,
    entries: &[ImportedEntry],
    cancel: Option<&AtomicBool>,
    progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<ImportResult> {
    run_import(entries, cancel, progress, |entry| reconcile_entry(store, entry))
}
