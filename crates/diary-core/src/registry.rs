//! Registry of named journals (`journals.toml`).
//!
//! Each journal is an independent database file. The registry only records
//! where they are and which one is active; it never creates or deletes the
//! files themselves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DiaryError, Result};

/// One registered journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// 16 lowercase hex characters
    pub id: String,
    pub name: String,

    /// Database file
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_id: Option<String>,

    #[serde(default)]
    journals: Vec<JournalConfig>,
}

/// The journal list, persisted after every change.
#[derive(Debug)]
pub struct JournalRegistry {
    path: PathBuf,
    file: RegistryFile,
}

impl JournalRegistry {
    /// Load the registry. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let mut file: RegistryFile = toml::from_str(&contents)
                .map_err(|e| DiaryError::Config(format!("Failed to parse journal registry: {}", e)))?;
            // Drop a dangling active id rather than failing the load
            if let Some(active) = file.active_id.as_deref() {
                if !file.journals.iter().any(|journal| journal.id == active) {
                    file.active_id = None;
                }
            }
            file
        } else {
            RegistryFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[JournalConfig] {
        &self.file.journals
    }

    pub fn get(&self, id: &str) -> Option<&JournalConfig> {
        self.file.journals.iter().find(|journal| journal.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.file.active_id.as_deref()
    }

    pub fn get_active(&self) -> Option<&JournalConfig> {
        self.active_id().and_then(|id| self.get(id))
    }

    /// Register a journal. The first journal added becomes active.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank name or a relative path, `Policy` if the
    /// path is already registered.
    pub fn add(&mut self, name: &str, path: &Path) -> Result<JournalConfig> {
        let name = validate_name(name)?;
        if !path.is_absolute() {
            return Err(DiaryError::InvalidInput(
                "Journal path must be absolute".to_string(),
            ));
        }
        if self.file.journals.iter().any(|journal| journal.path == path) {
            return Err(DiaryError::Policy(
                "This journal is already registered".to_string(),
            ));
        }

        let journal = JournalConfig {
            id: self.unused_id()?,
            name,
            path: path.to_path_buf(),
        };
        self.file.journals.push(journal.clone());
        if self.file.active_id.is_none() {
            self.file.active_id = Some(journal.id.clone());
        }
        self.save()?;

        info!(journal = %journal.id, "Registered journal");
        Ok(journal)
    }

    /// Unregister a journal without touching its file.
    ///
    /// Removing the active journal activates the first remaining one.
    pub fn remove(&mut self, id: &str) -> Result<JournalConfig> {
        let index = self
            .file
            .journals
            .iter()
            .position(|journal| journal.id == id)
            .ok_or_else(|| DiaryError::NotFound(format!("Journal {}", id)))?;
        let removed = self.file.journals.remove(index);

        if self.file.active_id.as_deref() == Some(id) {
            self.file.active_id = self.file.journals.first().map(|journal| journal.id.clone());
        }
        self.save()?;

        info!(journal = %removed.id, "Removed journal");
        Ok(removed)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        let name = validate_name(name)?;
        let journal = self
            .file
            .journals
            .iter_mut()
            .find(|journal| journal.id == id)
            .ok_or_else(|| DiaryError::NotFound(format!("Journal {}", id)))?;
        journal.name = name;
        self.save()?;

        info!(journal = %id, "Renamed journal");
        Ok(())
    }

    /// Mark a journal as active. Locking the previous one is the session
    /// controller's job.
    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(DiaryError::NotFound(format!("Journal {}", id)));
        }
        self.file.active_id = Some(id.to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(&self.file)
            .map_err(|e| DiaryError::Config(format!("TOML error: {}", e)))?;
        crate::fs::write_atomic(&self.path, contents.as_bytes(), false)?;
        Ok(())
    }

    fn unused_id(&self) -> Result<String> {
        loop {
            let id = generate_id()?;
            if self.get(&id).is_none() {
                return Ok(id);
            }
        }
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DiaryError::InvalidInput(
            "Journal name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn generate_id() -> Result<String> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| DiaryError::Crypto(format!("Random generation failed: {}", e)))?;
    Ok(bytes.iter().map(|byte| format!("{:02x}", byte)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_first_journal_becomes_active() {
        let dir = tempdir().unwrap();
        let mut registry = JournalRegistry::load(&dir.path().join("journals.toml")).unwrap();
        assert!(registry.get_active().is_none());

        let first = registry.add("Personal", &dir.path().join("a.db")).unwrap();
        let second = registry.add("Work", &dir.path().join("b.db")).unwrap();

        assert_eq!(first.id.len(), 16);
        assert!(first.id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(registry.active_id(), Some(first.id.as_str()));
        assert_eq!(registry.list().len(), 2);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_persisted_across_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journals.toml");
        let mut registry = JournalRegistry::load(&path).unwrap();
        registry.add("Personal", &dir.path().join("a.db")).unwrap();
        let work = registry.add("Work", &dir.path().join("b.db")).unwrap();
        registry.set_active(&work.id).unwrap();
        registry.rename(&work.id, "  Office ").unwrap();

        let reloaded = JournalRegistry::load(&path).unwrap();
        assert_eq!(reloaded.list(), registry.list());
        assert_eq!(reloaded.get_active().unwrap().name, "Office");
    }

    #[test]
    fn test_remove_active_falls_back_to_first() {
        let dir = tempdir().unwrap();
        let mut registry = JournalRegistry::load(&dir.path().join("journals.toml")).unwrap();
        let a = registry.add("A", &dir.path().join("a.db")).unwrap();
        let b = registry.add("B", &dir.path().join("b.db")).unwrap();
        std::fs::write(&a.path, b"keep").unwrap();

        registry.remove(&a.id).unwrap();
        assert_eq!(registry.active_id(), Some(b.id.as_str()));
        assert!(a.path.exists());

        registry.remove(&b.id).unwrap();
        assert_eq!(registry.active_id(), None);
        assert!(matches!(registry.remove(&b.id), Err(DiaryError::NotFound(_))));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let dir = tempdir().unwrap();
        let mut registry = JournalRegistry::load(&dir.path().join("journals.toml")).unwrap();

        assert!(matches!(
            registry.add("  ", &dir.path().join("a.db")),
            Err(DiaryError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.add("Relative", Path::new("diary.db")),
            Err(DiaryError::InvalidInput(_))
        ));

        let a = registry.add("A", &dir.path().join("a.db")).unwrap();
        assert!(matches!(
            registry.add("Again", &dir.path().join("a.db")),
            Err(DiaryError::Policy(_))
        ));
        assert!(matches!(registry.rename(&a.id, ""), Err(DiaryError::InvalidInput(_))));
        assert!(matches!(registry.set_active("0000000000000000"), Err(DiaryError::NotFound(_))));
    }
}
