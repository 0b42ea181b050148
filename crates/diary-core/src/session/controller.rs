//! Session controller: the only owner of the unlocked journal.
//!
//! Lock order is `journal` then `state` then `idle`. The registry mutex is
//! only ever held on its own.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{DiaryLocked, LockReason, EVENT_CAPACITY};
use super::idle::IdleTimer;
use super::state::{transition, SessionEvent, SessionState};
use crate::auth::{AuthSlotInfo, KeyManager};
use crate::config::DiaryConfig;
use crate::error::{DiaryError, Result};
use crate::export::{self, ExportFormat, ExportResult};
use crate::import::{self, reconcile_entry, run_import, ImportFormat, ImportResult};
use crate::registry::{JournalConfig, JournalRegistry};
use crate::stats::{self, Statistics};
use crate::storage::{Database, DiaryEntry, EntryStore, SearchHit, UnlockedJournal};
use crate::{backup, navigation};

struct Inner {
    config: DiaryConfig,
    key_manager: KeyManager,
    registry: Mutex<JournalRegistry>,
    journal: Mutex<Option<UnlockedJournal>>,
    state: Mutex<SessionState>,
    switching: AtomicBool,
    events: broadcast::Sender<DiaryLocked>,
    idle: Mutex<Option<IdleTimer>>,

    /// Bumped on every create or unlock; an idle timeout only locks the
    /// unlock it was armed for
    idle_generation: AtomicU64,
}

/// Handle to a diary session. Clones share the same session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Start a session over `registry` and select its active journal.
    ///
    /// The idle timer only runs when called inside a tokio runtime and
    /// auto-lock is enabled.
    pub fn new(config: DiaryConfig, registry: JournalRegistry) -> Result<Self> {
        let timeout = config.session.idle_timeout();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            key_manager: KeyManager::from_config(&config.security),
            config,
            registry: Mutex::new(registry),
            journal: Mutex::new(None),
            state: Mutex::new(SessionState::Checking),
            switching: AtomicBool::new(false),
            events,
            idle: Mutex::new(timeout.and_then(|timeout| spawn_idle_timer(weak.clone(), timeout))),
            idle_generation: AtomicU64::new(0),
        });

        let controller = Self { inner };
        controller.inner.advance(SessionEvent::RegistryLoaded)?;
        controller.inner.select_active()?;
        Ok(controller)
    }

    pub fn config(&self) -> &DiaryConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SessionState {
        *guard(&self.inner.state)
    }

    /// Receive a [`DiaryLocked`] for every idle or system lock.
    pub fn subscribe(&self) -> broadcast::Receiver<DiaryLocked> {
        self.inner.events.subscribe()
    }

    /// Replace the idle timeout. `None` turns auto-lock off.
    pub fn set_idle_timeout(&self, timeout: Option<Duration>) {
        let unlocked = self.is_diary_unlocked();
        let timer = timeout.and_then(|timeout| spawn_idle_timer(Arc::downgrade(&self.inner), timeout));
        if unlocked {
            if let Some(timer) = timer.as_ref() {
                timer.arm();
            }
        }
        *guard(&self.inner.idle) = timer;
    }

    /// Push the idle deadline back.
    pub fn record_activity(&self) {
        self.inner.record_activity();
    }

    // -- Authentication --

    /// Whether the active journal's database file exists.
    pub fn diary_exists(&self) -> bool {
        self.inner
            .active_journal()
            .is_some_and(|journal| journal.path.exists())
    }

    pub fn is_diary_unlocked(&self) -> bool {
        guard(&self.inner.journal).is_some()
    }

    /// Create the active journal's database and unlock it.
    pub fn create_diary(&self, password: &str) -> Result<()> {
        let path = self.inner.active_path()?;
        let mut journal = guard(&self.inner.journal);
        self.inner.expect_state(SessionState::NoDiary)?;

        let (db, key) = self.inner.key_manager.create(&path, password)?;
        *journal = Some(UnlockedJournal::open(db, key)?);
        self.inner.advance(SessionEvent::Created)?;
        self.inner.arm_idle();

        info!(path = %path.display(), "Diary created");
        Ok(())
    }

    pub fn unlock_diary(&self, password: &str) -> Result<()> {
        self.unlock_with(|manager, db| manager.unlock_with_password(db, password))
    }

    pub fn unlock_diary_with_keypair(&self, key_file: &Path) -> Result<()> {
        self.unlock_with(|manager, db| manager.unlock_with_keyfile(db, key_file))
    }

    fn unlock_with<F>(&self, authenticate: F) -> Result<()>
    where
        F: FnOnce(&KeyManager, &Database) -> Result<crate::crypto::SessionKey>,
    {
        let path = self.inner.active_path()?;
        let mut journal = guard(&self.inner.journal);
        if journal.is_some() {
            return Ok(());
        }
        self.inner.expect_state(SessionState::Locked)?;

        let db = Database::open(&path)?;
        let key = authenticate(&self.inner.key_manager, &db)?;
        let unlocked = journal.insert(UnlockedJournal::open(db, key)?);
        self.inner.advance(SessionEvent::Unlocked)?;
        self.inner.arm_idle();
        info!(path = %path.display(), "Diary unlocked");

        // Still holding the journal, so no write lands mid-snapshot
        let backups = &self.inner.config.backups;
        if backups.enabled {
            let conn = unlocked.database().conn();
            if let Err(err) = backup::backup_and_rotate(conn, &path, backups.max_backups) {
                warn!(error = %err, "Backup after unlock failed");
            }
        }
        Ok(())
    }

    /// Lock the diary. Locking an already locked diary does nothing.
    pub fn lock_diary(&self) -> Result<()> {
        self.inner.lock_with(LockReason::Manual)
    }

    /// The operating system session locked.
    pub fn notify_system_lock(&self) -> Result<()> {
        self.inner.lock_with(LockReason::System)
    }

    pub fn change_password(&self, old: &str, new: &str) -> Result<()> {
        self.inner.with_journal(|journal| {
            let (db, key) = journal.parts_mut();
            self.inner.key_manager.change_password(db, key, old, new)
        })
    }

    /// Check `password` against the password method of the unlocked journal.
    pub fn verify_password(&self, password: &str) -> Result<()> {
        self.inner.with_journal(|journal| {
            self.inner
                .key_manager
                .verify_password(journal.database(), journal.key(), password)
        })
    }

    /// Delete the active journal's database file. Backups are kept.
    pub fn reset_diary(&self) -> Result<()> {
        let path = self.inner.active_path()?;
        self.inner.lock_with(LockReason::Reset)?;
        self.inner.expect_state(SessionState::Locked)?;

        for file in sqlite_files(&path) {
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        self.inner.advance(SessionEvent::Reset)?;

        info!(path = %path.display(), "Diary reset");
        Ok(())
    }

    pub fn add_password(&self, password: &str) -> Result<AuthSlotInfo> {
        self.inner.with_journal(|journal| {
            let (db, key) = journal.parts_mut();
            self.inner.key_manager.add_password(db, key, password)
        })
    }

    pub fn add_keyfile(&self, path: &Path, label: &str) -> Result<AuthSlotInfo> {
        self.inner.with_journal(|journal| {
            let (db, key) = journal.parts_mut();
            self.inner.key_manager.add_keyfile(db, key, path, label)
        })
    }

    pub fn remove_auth_method(&self, id: i64) -> Result<()> {
        self.inner.with_journal(|journal| {
            self.inner.key_manager.remove_method(journal.database_mut(), id)
        })
    }

    /// Methods on the active journal. Works while locked.
    pub fn list_auth_methods(&self) -> Result<Vec<AuthSlotInfo>> {
        {
            let journal = guard(&self.inner.journal);
            if let Some(journal) = journal.as_ref() {
                return self.inner.key_manager.list_methods(journal.database());
            }
        }

        let path = self.inner.active_path()?;
        if !path.exists() {
            return Err(DiaryError::NotFound("Diary".to_string()));
        }
        let db = Database::open(&path)?;
        self.inner.key_manager.list_methods(&db)
    }

    // -- Entries --

    pub fn create_entry(&self, date: NaiveDate) -> Result<DiaryEntry> {
        self.inner.with_journal(|journal| journal.create_entry(date))
    }

    /// Save content. Blank content deletes the entry and returns `None`.
    pub fn save_entry(&self, id: &Uuid, title: &str, text: &str) -> Result<Option<DiaryEntry>> {
        self.inner.with_journal(|journal| journal.save_entry(id, title, text))
    }

    pub fn get_entry(&self, id: &Uuid) -> Result<DiaryEntry> {
        self.inner.with_journal(|journal| {
            journal
                .get_entry(id)?
                .ok_or_else(|| DiaryError::NotFound(format!("Entry {}", id)))
        })
    }

    pub fn get_entries_for_date(&self, date: NaiveDate) -> Result<Vec<DiaryEntry>> {
        self.inner.with_journal(|journal| journal.get_entries_for_date(date))
    }

    pub fn delete_entry_if_empty(&self, id: &Uuid, title: &str, text: &str) -> Result<bool> {
        self.inner
            .with_journal(|journal| journal.delete_entry_if_empty(id, title, text))
    }

    pub fn get_all_entry_dates(&self) -> Result<BTreeSet<NaiveDate>> {
        self.inner.with_journal(|journal| journal.get_all_entry_dates())
    }

    pub fn list_entries(&self) -> Result<Vec<DiaryEntry>> {
        self.inner.with_journal(|journal| journal.list_entries())
    }

    pub fn search_entries(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.inner.with_journal(|journal| journal.search(query))
    }

    pub fn statistics(&self) -> Result<Statistics> {
        let entries = self.list_entries()?;
        Ok(stats::compute(&entries, navigation::today()))
    }

    pub fn check_integrity(&self) -> Result<()> {
        self.inner.with_journal(|journal| journal.check_integrity())
    }

    pub fn export_json(&self, path: &Path) -> Result<ExportResult> {
        self.export(path, ExportFormat::Json)
    }

    pub fn export_markdown(&self, path: &Path) -> Result<ExportResult> {
        self.export(path, ExportFormat::Markdown)
    }

    /// Write every entry to `path` in `format`.
    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<ExportResult> {
        let entries = self.list_entries()?;
        match format {
            ExportFormat::Json => export::export_json(&entries, path),
            ExportFormat::Markdown => export::export_markdown(&entries, path),
        }
    }

    // -- Import --

    /// Parse `path` and reconcile its entries into the unlocked journal.
    ///
    /// Each entry commits on its own. If the diary locks part way through,
    /// the remaining entries fail with `Locked` and the committed ones stay.
    pub fn import_file(
        &self,
        path: &Path,
        format: ImportFormat,
        cancel: Option<&AtomicBool>,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<ImportResult> {
        if !self.is_diary_unlocked() {
            return Err(DiaryError::Locked);
        }
        let entries = import::parse_file(path, format)?;
        info!(format = %format, count = entries.len(), "Importing entries");

        run_import(&entries, cancel, progress, |entry| {
            self.inner
                .with_journal(|journal| reconcile_entry(journal, entry))
        })
    }

    pub fn import_minidiary_json(&self, path: &Path) -> Result<ImportResult> {
        self.import_file(path, ImportFormat::MiniDiaryJson, None, None)
    }

    pub fn import_dayone_json(&self, path: &Path) -> Result<ImportResult> {
        self.import_file(path, ImportFormat::DayOneJson, None, None)
    }

    pub fn import_dayone_txt(&self, path: &Path) -> Result<ImportResult> {
        self.import_file(path, ImportFormat::DayOneTxt, None, None)
    }

    pub fn import_jrnl_json(&self, path: &Path) -> Result<ImportResult> {
        self.import_file(path, ImportFormat::JrnlJson, None, None)
    }

    // -- Journals --

    pub fn list_journals(&self) -> Vec<JournalConfig> {
        guard(&self.inner.registry).list().to_vec()
    }

    pub fn get_active_journal_id(&self) -> Option<String> {
        guard(&self.inner.registry).active_id().map(str::to_string)
    }

    /// Register a journal. If it is the first one it is selected.
    pub fn add_journal(&self, name: &str, path: &Path) -> Result<JournalConfig> {
        let journal = guard(&self.inner.registry).add(name, path)?;
        if self.state() == SessionState::JournalSelect {
            self.inner.select_active()?;
        }
        Ok(journal)
    }

    /// Unregister a journal. Its file stays on disk.
    pub fn remove_journal(&self, id: &str) -> Result<JournalConfig> {
        let was_active = self.get_active_journal_id().as_deref() == Some(id);
        if was_active {
            self.inner.lock_with(LockReason::Removed)?;
        }

        let removed = guard(&self.inner.registry).remove(id)?;
        if was_active {
            self.inner.advance(SessionEvent::SwitchJournal)?;
            self.inner.select_active()?;
        }
        Ok(removed)
    }

    pub fn rename_journal(&self, id: &str, name: &str) -> Result<()> {
        guard(&self.inner.registry).rename(id, name)
    }

    /// Lock the current journal and select another. The new journal is
    /// left locked (or in `NoDiary` if its file does not exist).
    ///
    /// # Errors
    ///
    /// `Busy` if another switch is running, `NotFound` for an unknown id.
    pub fn switch_journal(&self, id: &str) -> Result<()> {
        let _switching = SwitchGuard::acquire(&self.inner.switching)?;

        if guard(&self.inner.registry).get(id).is_none() {
            return Err(DiaryError::NotFound(format!("Journal {}", id)));
        }

        self.inner.lock_with(LockReason::Switch)?;
        guard(&self.inner.registry).set_active(id)?;
        self.inner.advance(SessionEvent::SwitchJournal)?;
        self.inner.select_active()?;

        info!(journal = %id, "Switched journal");
        Ok(())
    }
}

impl Inner {
    fn active_journal(&self) -> Option<JournalConfig> {
        guard(&self.registry).get_active().cloned()
    }

    fn active_path(&self) -> Result<PathBuf> {
        self.active_journal()
            .map(|journal| journal.path)
            .ok_or_else(|| DiaryError::NotFound("No journal selected".to_string()))
    }

    fn advance(&self, event: SessionEvent) -> Result<SessionState> {
        let mut state = guard(&self.state);
        let next = transition(*state, event).ok_or_else(|| {
            DiaryError::Policy(format!("{:?} is not allowed while {:?}", event, *state))
        })?;
        *state = next;
        Ok(next)
    }

    fn expect_state(&self, expected: SessionState) -> Result<()> {
        let state = *guard(&self.state);
        if state == expected {
            return Ok(());
        }
        match state {
            SessionState::NoDiary => Err(DiaryError::NotFound("Diary".to_string())),
            SessionState::Checking | SessionState::JournalSelect => {
                Err(DiaryError::NotFound("No journal selected".to_string()))
            }
            SessionState::Locked => Err(DiaryError::Locked),
            SessionState::Unlocked => Err(DiaryError::Policy(
                "The diary is already unlocked".to_string(),
            )),
        }
    }

    /// From `JournalSelect`, move to `Locked` or `NoDiary` for the active
    /// journal. Without an active journal the state stays put.
    fn select_active(&self) -> Result<()> {
        if let Some(journal) = self.active_journal() {
            let exists = journal.path.exists();
            self.advance(SessionEvent::JournalSelected { exists })?;
        }
        Ok(())
    }

    fn with_journal<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnlockedJournal) -> Result<T>,
    {
        let mut journal = guard(&self.journal);
        let journal = journal.as_mut().ok_or(DiaryError::Locked)?;
        let result = f(journal);
        self.record_activity();
        result
    }

    fn lock_with(&self, reason: LockReason) -> Result<()> {
        self.lock_held(guard(&self.journal), reason)
    }

    /// Lock for an idle timeout that fired during `generation`.
    fn lock_idle(&self, generation: u64) -> Result<()> {
        let journal = guard(&self.journal);
        if self.idle_generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Ignoring stale idle timeout");
            return Ok(());
        }
        self.lock_held(journal, LockReason::Idle)
    }

    fn lock_held(&self, mut journal: MutexGuard<'_, Option<UnlockedJournal>>, reason: LockReason) -> Result<()> {
        let Some(unlocked) = journal.take() else {
            return Ok(());
        };
        drop(unlocked);
        self.advance(SessionEvent::Locked(reason))?;
        if let Some(timer) = guard(&self.idle).as_ref() {
            timer.disarm();
        }
        drop(journal);

        info!(reason = ?reason, "Diary locked");
        if reason.is_external() {
            // No receivers is not an error
            let _ = self.events.send(DiaryLocked { reason });
        }
        Ok(())
    }

    /// Start a new idle period. Called with the journal held.
    fn arm_idle(&self) {
        self.idle_generation.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = guard(&self.idle).as_ref() {
            timer.arm();
        }
    }

    fn record_activity(&self) {
        if let Some(timer) = guard(&self.idle).as_ref() {
            timer.activity();
        }
    }
}

fn spawn_idle_timer(session: Weak<Inner>, timeout: Duration) -> Option<IdleTimer> {
    let handle = Handle::try_current().ok()?;
    let on_idle = Arc::new(move || {
        let Some(inner) = session.upgrade() else {
            return;
        };
        let generation = inner.idle_generation.load(Ordering::SeqCst);
        tokio::task::spawn_blocking(move || {
            if let Err(err) = inner.lock_idle(generation) {
                warn!(error = %err, "Idle lock failed");
            }
        });
    });
    Some(IdleTimer::spawn(&handle, timeout, on_idle))
}

/// The database file and SQLite's side files.
fn sqlite_files(path: &Path) -> Vec<PathBuf> {
    let mut files = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        files.push(PathBuf::from(name));
    }
    files
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SwitchGuard<'a>(&'a AtomicBool);

impl<'a> SwitchGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DiaryError::Busy("A journal switch is already running".to_string()))?;
        Ok(Self(flag))
    }
}

impl Drop for SwitchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
