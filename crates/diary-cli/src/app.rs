//! Session setup, journal resolution and credential prompts.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use dialoguer::Password;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use diary_core::config::{default_config_path, default_registry_path};
use diary_core::storage::parse_date;
use diary_core::{DiaryConfig, DiaryError, JournalConfig, JournalRegistry, SessionController, SessionState};

use crate::cli::Cli;

const PASSWORD_ENV: &str = "DIARY_PASSWORD";
const NEW_PASSWORD_ENV: &str = "DIARY_NEW_PASSWORD";
const MAX_ATTEMPTS: usize = 3;

/// Load config and registry, then select the journal named by `--journal`.
pub fn load_session(cli: &Cli) -> anyhow::Result<SessionController> {
    let config_path = match cli.config.as_deref() {
        Some(path) => PathBuf::from(path),
        None => default_config_path()?,
    };
    let config = DiaryConfig::load(&config_path)?;
    let registry = JournalRegistry::load(&default_registry_path()?)?;
    debug!(config = %config_path.display(), "Loaded configuration");

    let session = SessionController::new(config, registry)?;
    if let Some(wanted) = cli.journal.as_deref() {
        let journal = find_journal(&session, wanted)?;
        if session.get_active_journal_id().as_deref() != Some(journal.id.as_str()) {
            session.switch_journal(&journal.id)?;
        }
    }
    Ok(session)
}

/// Find a journal by id, then by exact name.
pub fn find_journal(session: &SessionController, wanted: &str) -> anyhow::Result<JournalConfig> {
    let journals = session.list_journals();
    journals
        .iter()
        .find(|journal| journal.id == wanted)
        .or_else(|| journals.iter().find(|journal| journal.name == wanted))
        .cloned()
        .ok_or_else(|| anyhow!("No journal named \"{}\"", wanted))
}

/// Unlock the selected journal with the key file or a password.
pub fn unlock(session: &SessionController, cli: &Cli) -> anyhow::Result<()> {
    match session.state() {
        SessionState::Unlocked => return Ok(()),
        SessionState::Locked => {}
        SessionState::NoDiary => bail!("No diary yet. Run `diary init` first."),
        SessionState::Checking | SessionState::JournalSelect => {
            bail!("No journal selected. Run `diary init` or `diary journal add`.")
        }
    }

    if let Some(keyfile) = cli.keyfile.as_deref() {
        session.unlock_diary_with_keypair(Path::new(keyfile))?;
        return Ok(());
    }

    if let Some(password) = env_secret(PASSWORD_ENV) {
        session.unlock_diary(password.expose_secret())?;
        return Ok(());
    }

    if !interactive(cli) {
        bail!("Password required. Set {} or run in a TTY.", PASSWORD_ENV);
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let password = prompt_password("Password")?;
        match session.unlock_diary(password.expose_secret()) {
            Ok(()) => return Ok(()),
            Err(DiaryError::Authentication) if attempt < MAX_ATTEMPTS => {
                eprintln!("{}", DiaryError::Authentication.user_message());
            }
            Err(err) => return Err(err.into()),
        }
    }
    Err(DiaryError::Authentication.into())
}

/// Read an existing password from the environment or a prompt.
pub fn current_password(cli: &Cli, prompt: &str) -> anyhow::Result<SecretString> {
    if let Some(password) = env_secret(PASSWORD_ENV) {
        return Ok(password);
    }
    if !interactive(cli) {
        bail!("Password required. Set {} or run in a TTY.", PASSWORD_ENV);
    }
    prompt_password(prompt)
}

/// Read a new password, confirmed when prompted.
pub fn new_password(cli: &Cli) -> anyhow::Result<SecretString> {
    if let Some(password) = env_secret(NEW_PASSWORD_ENV) {
        return Ok(password);
    }
    if !interactive(cli) {
        bail!("New password required. Set {} or run in a TTY.", NEW_PASSWORD_ENV);
    }
    let password = Password::new()
        .with_prompt("New password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(SecretString::from(password))
}

/// Body text from the flag, or stdin when it is piped.
pub fn read_body(cli: &Cli, body: Option<&str>) -> anyhow::Result<String> {
    if let Some(body) = body {
        return Ok(body.to_string());
    }
    if std::io::stdin().is_terminal() || cli.no_input {
        return Ok(String::new());
    }
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim_end().to_string())
}

pub fn parse_day(value: Option<&str>) -> anyhow::Result<NaiveDate> {
    match value {
        Some(value) => parse_date(value)
            .ok_or_else(|| anyhow!("Invalid date \"{}\", expected YYYY-MM-DD", value)),
        None => Ok(diary_core::navigation::today()),
    }
}

pub fn interactive(cli: &Cli) -> bool {
    std::io::stdin().is_terminal() && !cli.no_input
}

fn prompt_password(prompt: &str) -> anyhow::Result<SecretString> {
    let password = Password::new().with_prompt(prompt).interact()?;
    Ok(SecretString::from(password))
}

fn env_secret(name: &str) -> Option<SecretString> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}
