use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use diary_core::{
    DiaryConfig, DiaryError, DiaryLocked, JournalRegistry, LockReason, SessionController,
    SessionState,
};
use tempfile::{tempdir, TempDir};

const PASSWORD: &str = "correct horse battery";

fn cheap_config() -> DiaryConfig {
    let mut config = DiaryConfig::default();
    config.security.kdf_memory_kib = 1024;
    config.security.kdf_iterations = 1;
    config.security.kdf_parallelism = 1;
    config.session.auto_lock = false;
    config
}

fn controller_with(dir: &TempDir, names: &[&str]) -> SessionController {
    let mut registry = JournalRegistry::load(&dir.path().join("journals.toml")).unwrap();
    for name in names {
        registry
            .add(name, &dir.path().join(format!("{}.db", name.to_lowercase())))
            .unwrap();
    }
    SessionController::new(cheap_config(), registry).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn file_contains(path: &Path, needle: &str) -> bool {
    let bytes = std::fs::read(path).unwrap();
    bytes
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}

#[test]
fn test_full_lifecycle() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    assert_eq!(session.state(), SessionState::NoDiary);

    session.create_diary(PASSWORD).unwrap();
    let entry = session.create_entry(day(1)).unwrap();
    let saved = session
        .save_entry(&entry.id, "Lighthouse", "<p>Walked to the lighthouse at dawn</p>")
        .unwrap()
        .unwrap();
    assert_eq!(saved.word_count, 6);

    let hits = session.search_entries("lightho").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry_id, entry.id);

    session.lock_diary().unwrap();
    let db_path = dir.path().join("personal.db");
    assert!(!file_contains(&db_path, "lighthouse"));
    assert!(!file_contains(&db_path, "Lighthouse"));

    session.unlock_diary(PASSWORD).unwrap();
    assert_eq!(session.get_entry(&entry.id).unwrap(), saved);
    assert_eq!(session.search_entries("dawn").unwrap().len(), 1);
    assert!(session.get_all_entry_dates().unwrap().contains(&day(1)));

    assert_eq!(session.save_entry(&entry.id, "  ", "<p></p>").unwrap(), None);
    assert!(matches!(session.get_entry(&entry.id), Err(DiaryError::NotFound(_))));
    assert!(session.search_entries("dawn").unwrap().is_empty());
    session.check_integrity().unwrap();
}

#[test]
fn test_change_password_keeps_entries() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();
    let entry = session.create_entry(day(2)).unwrap();
    session.save_entry(&entry.id, "Kept", "").unwrap();

    assert!(matches!(
        session.change_password("not the password", "new password 42"),
        Err(DiaryError::Authentication)
    ));
    assert!(matches!(
        session.change_password(PASSWORD, "short"),
        Err(DiaryError::WeakInput(_))
    ));
    session.change_password(PASSWORD, "new password 42").unwrap();
    session.lock_diary().unwrap();

    assert!(matches!(session.unlock_diary(PASSWORD), Err(DiaryError::Authentication)));
    session.unlock_diary("new password 42").unwrap();
    assert_eq!(session.get_entry(&entry.id).unwrap().title, "Kept");
}

#[test]
fn test_keyfile_unlock() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();
    let key_path = dir.path().join("keys").join("diary.key");
    session.add_keyfile(&key_path, "Laptop").unwrap();
    session.lock_diary().unwrap();

    session.unlock_diary_with_keypair(&key_path).unwrap();
    assert!(session.is_diary_unlocked());

    let methods = session.list_auth_methods().unwrap();
    let password = methods
        .iter()
        .find(|method| method.kind == diary_core::AuthKind::Password)
        .unwrap();
    session.remove_auth_method(password.id).unwrap();
    session.lock_diary().unwrap();
    assert!(matches!(session.unlock_diary(PASSWORD), Err(DiaryError::Authentication)));

    let other_dir = tempdir().unwrap();
    let other = controller_with(&other_dir, &["Other"]);
    other.create_diary(PASSWORD).unwrap();
    let stranger = other_dir.path().join("stranger.key");
    other.add_keyfile(&stranger, "Stranger").unwrap();
    assert!(matches!(
        session.unlock_diary_with_keypair(&stranger),
        Err(DiaryError::Authentication)
    ));
}

#[test]
fn test_switch_locks_previous_journal() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal", "Work"]);
    let journals = session.list_journals();
    let work = journals.iter().find(|journal| journal.name == "Work").unwrap();

    session.create_diary(PASSWORD).unwrap();
    let entry = session.create_entry(day(3)).unwrap();
    session.save_entry(&entry.id, "Private", "").unwrap();

    session.switch_journal(&work.id).unwrap();
    assert_eq!(session.get_active_journal_id().as_deref(), Some(work.id.as_str()));
    assert_eq!(session.state(), SessionState::NoDiary);
    assert!(matches!(session.get_entry(&entry.id), Err(DiaryError::Locked)));

    session.create_diary("work password 1").unwrap();
    assert!(session.get_all_entry_dates().unwrap().is_empty());

    assert!(matches!(
        session.switch_journal("ffffffffffffffff"),
        Err(DiaryError::NotFound(_))
    ));
    assert!(session.is_diary_unlocked());
}

#[test]
fn test_remove_active_journal_selects_next() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal", "Work"]);
    session.create_diary(PASSWORD).unwrap();
    let active = session.get_active_journal_id().unwrap();

    let removed = session.remove_journal(&active).unwrap();
    assert!(removed.path.exists());
    assert!(!session.is_diary_unlocked());
    assert_eq!(session.list_journals().len(), 1);
    assert_eq!(session.state(), SessionState::NoDiary);
}

#[test]
fn test_corrupted_entry_is_isolated() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();
    let good = session.create_entry(day(4)).unwrap();
    session.save_entry(&good.id, "Good", "intact words").unwrap();
    let bad = session.create_entry(day(5)).unwrap();
    session.save_entry(&bad.id, "Bad", "soon broken").unwrap();
    session.lock_diary().unwrap();

    let conn = rusqlite::Connection::open(dir.path().join("personal.db")).unwrap();
    conn.execute(
        "UPDATE entries SET ciphertext = zeroblob(48) WHERE id = ?1",
        [bad.id.to_string()],
    )
    .unwrap();
    drop(conn);

    session.unlock_diary(PASSWORD).unwrap();
    assert_eq!(session.get_entry(&good.id).unwrap().title, "Good");
    assert!(matches!(session.get_entry(&bad.id), Err(DiaryError::Integrity(_))));
    assert_eq!(session.search_entries("intact").unwrap().len(), 1);
    assert!(session.search_entries("broken").unwrap().is_empty());
    assert!(matches!(session.check_integrity(), Err(DiaryError::Integrity(_))));
}

#[test]
fn test_unlock_creates_backup() {
    let dir = tempdir().unwrap();
    let mut registry = JournalRegistry::load(&dir.path().join("journals.toml")).unwrap();
    let journal_path = dir.path().join("personal.db");
    registry.add("Personal", &journal_path).unwrap();
    let mut config = cheap_config();
    config.backups.max_backups = 2;
    let session = SessionController::new(config, registry).unwrap();

    session.create_diary(PASSWORD).unwrap();
    let entry = session.create_entry(day(4)).unwrap();
    session.save_entry(&entry.id, "Kept", "<p>in the backup</p>").unwrap();
    session.lock_diary().unwrap();
    session.unlock_diary(PASSWORD).unwrap();

    let backups = diary_core::backup::backups_dir(&journal_path);
    let first: Vec<_> = std::fs::read_dir(&backups)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(first.len(), 1);

    // Unlocks in the same second each get their own file, then rotate
    for _ in 0..2 {
        session.lock_diary().unwrap();
        session.unlock_diary(PASSWORD).unwrap();
    }
    assert_eq!(std::fs::read_dir(&backups).unwrap().count(), 2);

    let mut restore = JournalRegistry::load(&dir.path().join("restore.toml")).unwrap();
    let newest = std::fs::read_dir(&backups)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .max()
        .unwrap();
    restore.add("Restored", &newest).unwrap();
    let mut config = cheap_config();
    config.backups.enabled = false;
    let restored = SessionController::new(config, restore).unwrap();
    restored.unlock_diary(PASSWORD).unwrap();
    assert_eq!(restored.get_entry(&entry.id).unwrap().title, "Kept");
    restored.check_integrity().unwrap();
}

#[test]
fn test_lock_racing_save_leaves_entry_whole() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();

    for round in 0..4 {
        let entry = session.create_entry(day(round + 1)).unwrap();
        session.save_entry(&entry.id, "Old title", "<p>old text</p>").unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let writer = {
            let session = session.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                session.save_entry(&entry.id, "New title", "<p>new text</p>")
            })
        };
        barrier.wait();
        session.lock_diary().unwrap();
        let saved = writer.join().unwrap();

        session.unlock_diary(PASSWORD).unwrap();
        let stored = session.get_entry(&entry.id).unwrap();
        let expected = match saved {
            Ok(_) => ("New title", "<p>new text</p>"),
            Err(DiaryError::Locked) => ("Old title", "<p>old text</p>"),
            Err(other) => panic!("unexpected save error: {:?}", other),
        };
        assert_eq!((stored.title.as_str(), stored.text.as_str()), expected);
        let hits = session.search_entries(expected.0).unwrap();
        assert!(hits.iter().any(|hit| hit.entry_id == entry.id));
    }
    session.check_integrity().unwrap();
}

#[test]
fn test_markdown_export() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();
    let entry = session.create_entry(day(2)).unwrap();
    session
        .save_entry(&entry.id, "Market", "<p>Bought <strong>figs</strong></p><ul><li>Figs</li><li>Bread</li></ul>")
        .unwrap();

    let path = dir.path().join("diary.md");
    let result = session.export_markdown(&path).unwrap();
    assert_eq!(result.entries_exported, 1);

    let document = std::fs::read_to_string(&path).unwrap();
    assert!(document.contains("## 2024-03-02\n**Market**\nBought **figs**"));
    assert!(document.contains("- Figs\n- Bread"));

    session.lock_diary().unwrap();
    assert!(matches!(session.export_markdown(&path), Err(DiaryError::Locked)));
}

#[tokio::test]
async fn test_idle_timeout_locks_and_notifies() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    let mut events = session.subscribe();
    session.create_diary(PASSWORD).unwrap();

    session.set_idle_timeout(Some(Duration::from_millis(100)));
    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("idle lock should fire")
        .unwrap();

    assert_eq!(
        event,
        DiaryLocked {
            reason: LockReason::Idle
        }
    );
    assert_eq!(session.state(), SessionState::Locked);
    assert!(matches!(session.create_entry(day(6)), Err(DiaryError::Locked)));
}

#[tokio::test]
async fn test_activity_keeps_session_open() {
    let dir = tempdir().unwrap();
    let session = controller_with(&dir, &["Personal"]);
    session.create_diary(PASSWORD).unwrap();
    session.set_idle_timeout(Some(Duration::from_millis(300)));

    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.record_activity();
    }
    assert!(session.is_diary_unlocked());

    session.set_idle_timeout(None);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(session.is_diary_unlocked());
}
