use std::path::PathBuf;

use diary_core::SessionController;

use crate::app::find_journal;
use crate::cli::{Cli, JournalCommand};
use crate::output::{print_json, table};

pub fn handle_journal(cli: &Cli, session: &SessionController, command: &JournalCommand) -> anyhow::Result<()> {
    match command {
        JournalCommand::List { json } => {
            let journals = session.list_journals();
            if *json {
                return print_json(&journals);
            }
            let active = session.get_active_journal_id();
            let rows = journals
                .iter()
                .map(|journal| {
                    let marker = if active.as_deref() == Some(journal.id.as_str()) { "*" } else { "" };
                    vec![
                        marker.to_string(),
                        journal.id.clone(),
                        journal.name.clone(),
                        journal.path.display().to_string(),
                    ]
                })
                .collect();
            println!("{}", table(&["", "ID", "Name", "Path"], rows));
        }
        JournalCommand::Add { name, path } => {
            let path = std::path::absolute(PathBuf::from(path))?;
            let journal = session.add_journal(name, &path)?;
            if !cli.quiet {
                println!("Registered journal {} ({})", journal.name, journal.id);
            }
        }
        JournalCommand::Remove { journal } => {
            let journal = find_journal(session, journal)?;
            session.remove_journal(&journal.id)?;
            if !cli.quiet {
                println!(
                    "Removed journal {}; {} was left in place",
                    journal.name,
                    journal.path.display()
                );
            }
        }
        JournalCommand::Rename { journal, name } => {
            let journal = find_journal(session, journal)?;
            session.rename_journal(&journal.id, name)?;
            if !cli.quiet {
                println!("Renamed journal {}", journal.id);
            }
        }
        JournalCommand::Use { journal } => {
            let journal = find_journal(session, journal)?;
            session.switch_journal(&journal.id)?;
            if !cli.quiet {
                println!("Now using {}", journal.name);
            }
        }
    }
    Ok(())
}
