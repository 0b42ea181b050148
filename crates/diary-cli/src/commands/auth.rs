use std::path::Path;

use secrecy::ExposeSecret;

use diary_core::SessionController;

use crate::app::{current_password, new_password, unlock};
use crate::cli::{AuthCommand, Cli};
use crate::output::{print_json, table};

pub fn handle_auth(cli: &Cli, session: &SessionController, command: &AuthCommand) -> anyhow::Result<()> {
    match command {
        AuthCommand::List { json } => {
            let methods = session.list_auth_methods()?;
            if *json {
                return print_json(&methods);
            }
            let rows = methods
                .iter()
                .map(|method| {
                    vec![
                        method.id.to_string(),
                        method.kind.to_string(),
                        method.label.clone(),
                        method.created_at.format("%Y-%m-%d").to_string(),
                        method
                            .last_used
                            .map(|used| used.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "never".to_string()),
                    ]
                })
                .collect();
            println!("{}", table(&["ID", "Kind", "Label", "Created", "Last used"], rows));
        }
        AuthCommand::AddPassword => {
            unlock(session, cli)?;
            let password = new_password(cli)?;
            let method = session.add_password(password.expose_secret())?;
            if !cli.quiet {
                println!("Added password method {}", method.id);
            }
        }
        AuthCommand::AddKeyfile { path, label } => {
            unlock(session, cli)?;
            let existed = Path::new(path).exists();
            let method = session.add_keyfile(Path::new(path), label)?;
            if !cli.quiet {
                if existed {
                    println!("Added key file method {}", method.id);
                } else {
                    println!("Generated {} and added key file method {}", path, method.id);
                    println!("Keep this file safe: anyone holding it can unlock the diary.");
                }
            }
        }
        AuthCommand::Remove { id } => {
            unlock(session, cli)?;
            session.remove_auth_method(*id)?;
            if !cli.quiet {
                println!("Removed method {}", id);
            }
        }
        AuthCommand::ChangePassword => {
            unlock(session, cli)?;
            let old = current_password(cli, "Current password")?;
            let new = new_password(cli)?;
            session.change_password(old.expose_secret(), new.expose_secret())?;
            if !cli.quiet {
                println!("Password changed");
            }
        }
        AuthCommand::Verify => {
            unlock(session, cli)?;
            let password = current_password(cli, "Password to check")?;
            session.verify_password(password.expose_secret())?;
            if !cli.quiet {
                println!("Password is correct");
            }
        }
    }
    Ok(())
}
