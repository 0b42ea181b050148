//! Diary CLI - an encrypted, local-first journal
//!
//! This is the command-line interface for the diary core library.

mod app;
mod cli;
mod commands;
mod output;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use diary_core::DiaryError;

use crate::cli::{Cli, Commands};
use crate::commands::{auth, entries, journals, maintenance, transfer};

const LOG_ENV: &str = "DIARY_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        report(&err);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let session = app::load_session(cli)?;

    match &cli.command {
        Commands::Init(args) => maintenance::handle_init(cli, &session, args),
        Commands::Write(args) => entries::handle_write(cli, &session, args),
        Commands::Show(args) => entries::handle_show(cli, &session, args),
        Commands::Edit(args) => entries::handle_edit(cli, &session, args),
        Commands::Delete { id } => entries::handle_delete(cli, &session, id),
        Commands::List { json } => entries::handle_list(cli, &session, *json),
        Commands::Search { query, limit, json } => {
            entries::handle_search(cli, &session, query, *limit, *json)
        }
        Commands::Dates(args) => entries::handle_dates(cli, &session, args),
        Commands::Stats { json } => entries::handle_stats(cli, &session, *json),
        Commands::Import(args) => transfer::handle_import(cli, &session, args),
        Commands::Export { path, format } => transfer::handle_export(cli, &session, path, format),
        Commands::Check => maintenance::handle_check(cli, &session),
        Commands::Reset { yes } => maintenance::handle_reset(cli, &session, *yes),
        Commands::Auth(command) => auth::handle_auth(cli, &session, command),
        Commands::Journal(command) => journals::handle_journal(cli, &session, command),
    }
}

/// Print a user-safe message. Full detail goes to the log only.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<DiaryError>() {
        Some(diary_err) => {
            debug!(error = %diary_err, "Command failed");
            eprintln!("Error: {}", diary_err.user_message());
        }
        None => eprintln!("Error: {}", err),
    }
}
