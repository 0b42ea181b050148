//! `config.toml` and default locations.
//!
//! Every section is optional; missing values fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{DEFAULT_ITERATIONS, DEFAULT_MEMORY_KIB, DEFAULT_PARALLELISM};
use crate::crypto::password::DEFAULT_MIN_PASSWORD_LENGTH;
use crate::crypto::KdfParams;
use crate::error::{DiaryError, Result};

const APP_DIR: &str = "diary";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryConfig {
    #[serde(default)]
    pub security: SecuritySection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub backups: BackupSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub kdf_memory_kib: u32,
    pub kdf_iterations: u32,
    pub kdf_parallelism: u32,
    pub min_password_length: usize,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            kdf_memory_kib: DEFAULT_MEMORY_KIB,
            kdf_iterations: DEFAULT_ITERATIONS,
            kdf_parallelism: DEFAULT_PARALLELISM,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl SecuritySection {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.kdf_memory_kib, self.kdf_iterations, self.kdf_parallelism)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub auto_lock: bool,
    pub idle_timeout_seconds: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            auto_lock: true,
            idle_timeout_seconds: 300,
        }
    }
}

impl SessionSection {
    /// Idle timeout, or `None` when auto-lock is off.
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.auto_lock && self.idle_timeout_seconds > 0 {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupSection {
    pub enabled: bool,
    pub max_backups: usize,
}

impl Default for BackupSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_backups: 50,
        }
    }
}

impl DiaryConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| DiaryError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| DiaryError::Config(format!("TOML error: {}", e)))?;
        crate::fs::write_atomic(path, contents.as_bytes(), false)?;
        Ok(())
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_registry_path() -> Result<PathBuf> {
    Ok(xdg_config_dir()?.join("journals.toml"))
}

pub fn default_journal_path() -> Result<PathBuf> {
    Ok(xdg_data_dir()?.join("diary.db"))
}

pub fn xdg_config_dir() -> Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".config").join(APP_DIR))
}

pub fn xdg_data_dir() -> Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join(APP_DIR));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join(APP_DIR))
}

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| DiaryError::Config("HOME is not set; cannot resolve default paths".to_string()))?;
    Ok(PathBuf::from(home))
}
