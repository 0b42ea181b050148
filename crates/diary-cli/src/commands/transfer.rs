use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use diary_core::{ExportFormat, ImportFormat, SessionController};

use crate::app::{interactive, unlock};
use crate::cli::{Cli, ImportArgs};
use crate::output::print_json;

pub fn handle_import(cli: &Cli, session: &SessionController, args: &ImportArgs) -> anyhow::Result<()> {
    let format: ImportFormat = args.format.parse()?;
    unlock(session, cli)?;

    let bar = if interactive(cli) && !cli.quiet && !args.json {
        let bar = ProgressBar::new(0);
        bar.set_style(ProgressStyle::default_bar().template("{msg} [{bar:30.cyan/dim}] {pos}/{len}")?);
        bar.set_message("Importing");
        Some(bar)
    } else {
        None
    };
    let mut report = |done: usize, total: usize| {
        if let Some(bar) = bar.as_ref() {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }
    };

    let result = session.import_file(Path::new(&args.path), format, None, Some(&mut report));
    if let Some(bar) = bar.as_ref() {
        bar.finish_and_clear();
    }
    let result = result?;

    if args.json {
        return print_json(&result);
    }
    if !cli.quiet {
        println!(
            "Imported {}, merged {}, skipped {}",
            result.entries_imported, result.entries_merged, result.entries_skipped
        );
    }
    Ok(())
}

pub fn handle_export(cli: &Cli, session: &SessionController, path: &str, format: &str) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    unlock(session, cli)?;
    let result = session.export(Path::new(path), format)?;
    if !cli.quiet {
        println!(
            "Exported {} entries to {}",
            result.entries_exported,
            result.file_path.display()
        );
    }
    Ok(())
}
