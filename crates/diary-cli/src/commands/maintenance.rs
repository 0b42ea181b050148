use std::path::PathBuf;

use anyhow::bail;
use secrecy::ExposeSecret;

use diary_core::config::default_journal_path;
use diary_core::{SessionController, SessionState};

use crate::app::{interactive, new_password, unlock};
use crate::cli::{Cli, InitArgs};

pub fn handle_init(cli: &Cli, session: &SessionController, args: &InitArgs) -> anyhow::Result<()> {
    if let Some(path) = args.path.as_deref() {
        let path = std::path::absolute(PathBuf::from(path))?;
        let journal = session.add_journal(&args.name, &path)?;
        if session.get_active_journal_id().as_deref() != Some(journal.id.as_str()) {
            session.switch_journal(&journal.id)?;
        }
    } else if session.list_journals().is_empty() {
        session.add_journal(&args.name, &default_journal_path()?)?;
    }

    if session.state() != SessionState::NoDiary {
        bail!("This journal already has a diary. Use `diary reset` to start over.");
    }

    let password = new_password(cli)?;
    session.create_diary(password.expose_secret())?;
    if !cli.quiet {
        println!("Diary created");
    }
    Ok(())
}

pub fn handle_check(cli: &Cli, session: &SessionController) -> anyhow::Result<()> {
    unlock(session, cli)?;
    match session.check_integrity() {
        Ok(()) => {
            if !cli.quiet {
                println!("Integrity check: OK");
                println!("- entries decrypt: OK");
                println!("- search index: OK");
                println!("- metadata keys: OK");
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("Integrity check: FAILED");
            eprintln!("- {}", err.user_message());
            eprintln!("Hint: Restore from a backup or export data before retrying.");
            Err(err.into())
        }
    }
}

pub fn handle_reset(cli: &Cli, session: &SessionController, yes: bool) -> anyhow::Result<()> {
    if !yes {
        if !interactive(cli) {
            bail!("Refusing to reset without --yes");
        }
        let proceed = dialoguer::Confirm::new()
            .with_prompt("Delete this diary? Entries not in a backup or export are lost")
            .default(false)
            .interact()?;
        if !proceed {
            bail!("Reset cancelled");
        }
    }

    session.reset_diary()?;
    if !cli.quiet {
        println!("Diary deleted");
    }
    Ok(())
}
