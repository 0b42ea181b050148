//! Copies of the journal taken after each unlock.
//!
//! Backups live in a `backups/` directory beside the journal and are named
//! `<stem>-backup-%Y-%m-%d-%Hh%Mm%S-<millis>.db`, so lexical order is age
//! order.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{DiaryError, Result};

const BACKUP_DIR: &str = "backups";

/// Directory holding backups for `journal_path`.
pub fn backups_dir(journal_path: &Path) -> PathBuf {
    match journal_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(BACKUP_DIR),
        _ => PathBuf::from(BACKUP_DIR),
    }
}

/// Snapshot the journal open on `conn` into its backups directory.
///
/// SQLite writes the snapshot from the connection itself, so the copy is a
/// single consistent state of the database. No other writer may use `conn`
/// until this returns.
pub fn create_backup(conn: &Connection, journal_path: &Path) -> Result<PathBuf> {
    let backup_path = next_backup_path(journal_path)?;
    let temp_path = crate::fs::create_private_temp(&backup_path)?;

    if let Err(err) = snapshot_into(conn, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    crate::fs::rename_with_fallback(&temp_path, &backup_path)?;
    debug!("Created backup");
    Ok(backup_path)
}

/// Delete the oldest backups of `journal_path` beyond `max_backups`.
///
/// Returns the number of files removed.
pub fn rotate_backups(journal_path: &Path, max_backups: usize) -> Result<usize> {
    let dir = backups_dir(journal_path);
    if !dir.exists() {
        return Ok(0);
    }

    let prefix = format!("{}-backup-", file_stem(journal_path)?);
    let mut backups: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".db"))
        })
        .collect();

    if backups.len() <= max_backups {
        return Ok(0);
    }

    backups.sort();
    let excess = backups.len() - max_backups;
    for path in backups.iter().take(excess) {
        fs::remove_file(path)?;
    }

    info!(removed = excess, "Rotated backups");
    Ok(excess)
}

/// Back up and rotate in one step.
pub fn backup_and_rotate(conn: &Connection, journal_path: &Path, max_backups: usize) -> Result<PathBuf> {
    let backup = create_backup(conn, journal_path)?;
    rotate_backups(journal_path, max_backups)?;
    Ok(backup)
}

fn snapshot_into(conn: &Connection, target: &Path) -> Result<()> {
    let target_str = target
        .to_str()
        .ok_or_else(|| DiaryError::InvalidInput("Invalid backup path".to_string()))?;
    conn.execute("VACUUM main INTO ?1", [target_str])?;
    fs::File::open(target)?.sync_all()?;
    Ok(())
}

/// A fresh name in the backups directory. Millisecond timestamps can still
/// collide, so a counter is appended until the name is unused.
fn next_backup_path(journal_path: &Path) -> Result<PathBuf> {
    let stem = file_stem(journal_path)?;
    let dir = backups_dir(journal_path);
    let timestamp = Local::now().format("%Y-%m-%d-%Hh%Mm%S-%3f").to_string();

    let mut path = dir.join(format!("{}-backup-{}.db", stem, timestamp));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{}-backup-{}-{}.db", stem, timestamp, counter));
        counter += 1;
    }
    Ok(path)
}

fn file_stem(path: &Path) -> Result<&str> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| DiaryError::InvalidInput("Invalid journal file name".to_string()))
}
