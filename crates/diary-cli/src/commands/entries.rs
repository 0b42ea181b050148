use diary_core::storage::format_date;
use diary_core::{navigation, SessionController};

use crate::app::{parse_day, read_body, unlock};
use crate::cli::{Cli, DatesArgs, EditArgs, ShowArgs, WriteArgs};
use crate::output::{entry_rows, print_entry, print_json, summary, table, ENTRY_HEADERS};

use super::parse_entry_id;

pub fn handle_write(cli: &Cli, session: &SessionController, args: &WriteArgs) -> anyhow::Result<()> {
    let date = parse_day(args.date.as_deref())?;
    let body = read_body(cli, args.body.as_deref())?;
    unlock(session, cli)?;

    let entry = session.create_entry(date)?;
    match session.save_entry(&entry.id, &args.title, &body)? {
        Some(saved) => {
            if !cli.quiet {
                println!("Saved entry {} for {}", saved.id, format_date(saved.date));
            }
        }
        None => {
            if !cli.quiet {
                println!("Nothing to save");
            }
        }
    }
    Ok(())
}

pub fn handle_show(cli: &Cli, session: &SessionController, args: &ShowArgs) -> anyhow::Result<()> {
    let date = parse_day(args.date.as_deref())?;
    unlock(session, cli)?;

    let entries = session.get_entries_for_date(date)?;
    if args.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        if !cli.quiet {
            println!("No entries for {}", format_date(date));
        }
        return Ok(());
    }
    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print_entry(entry);
    }
    Ok(())
}

pub fn handle_edit(cli: &Cli, session: &SessionController, args: &EditArgs) -> anyhow::Result<()> {
    let id = parse_entry_id(&args.id)?;
    unlock(session, cli)?;

    let entry = session.get_entry(&id)?;
    let title = args.title.as_deref().unwrap_or(&entry.title);
    let text = args.body.as_deref().unwrap_or(&entry.text);
    match session.save_entry(&id, title, text)? {
        Some(_) if !cli.quiet => println!("Updated entry {}", id),
        None if !cli.quiet => println!("Entry {} was empty and has been deleted", id),
        _ => {}
    }
    Ok(())
}

pub fn handle_delete(cli: &Cli, session: &SessionController, id: &str) -> anyhow::Result<()> {
    let id = parse_entry_id(id)?;
    unlock(session, cli)?;

    // Confirms the entry exists before blanking it
    session.get_entry(&id)?;
    session.save_entry(&id, "", "")?;
    if !cli.quiet {
        println!("Deleted entry {}", id);
    }
    Ok(())
}

pub fn handle_list(cli: &Cli, session: &SessionController, json: bool) -> anyhow::Result<()> {
    unlock(session, cli)?;
    let entries = session.list_entries()?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        if !cli.quiet {
            println!("No entries yet");
        }
        return Ok(());
    }
    println!("{}", table(ENTRY_HEADERS, entry_rows(&entries)));
    Ok(())
}

pub fn handle_search(
    cli: &Cli,
    session: &SessionController,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    unlock(session, cli)?;
    let mut hits = session.search_entries(query)?;
    if let Some(limit) = limit {
        hits.truncate(limit);
    }
    if json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        if !cli.quiet {
            println!("No matches");
        }
        return Ok(());
    }

    let rows = hits
        .iter()
        .map(|hit| {
            vec![
                format_date(hit.date),
                hit.title.clone(),
                summary(&hit.snippet.replace("<mark>", "[").replace("</mark>", "]")),
                hit.entry_id.to_string(),
            ]
        })
        .collect();
    println!("{}", table(&["Date", "Title", "Match", "ID"], rows));
    Ok(())
}

pub fn handle_dates(cli: &Cli, session: &SessionController, args: &DatesArgs) -> anyhow::Result<()> {
    unlock(session, cli)?;
    let dates = session.get_all_entry_dates()?;

    let nearest = if let Some(after) = args.after.as_deref() {
        Some(navigation::next_entry_date(&dates, parse_day(Some(after))?))
    } else if let Some(before) = args.before.as_deref() {
        Some(navigation::previous_entry_date(&dates, parse_day(Some(before))?))
    } else {
        None
    };

    match nearest {
        Some(found) => {
            if args.json {
                return print_json(&found);
            }
            match found {
                Some(date) => println!("{}", format_date(date)),
                None if !cli.quiet => println!("No entries in that direction"),
                None => {}
            }
        }
        None => {
            if args.json {
                return print_json(&dates);
            }
            for date in &dates {
                println!("{}", format_date(*date));
            }
        }
    }
    Ok(())
}

pub fn handle_stats(cli: &Cli, session: &SessionController, json: bool) -> anyhow::Result<()> {
    unlock(session, cli)?;
    let stats = session.statistics()?;
    if json {
        return print_json(&stats);
    }

    let rows = vec![
        vec!["Entries".to_string(), stats.total_entries.to_string()],
        vec!["Words".to_string(), stats.total_words.to_string()],
        vec!["Entries per week".to_string(), format!("{:.1}", stats.entries_per_week)],
        vec!["Words per entry".to_string(), format!("{:.0}", stats.avg_words_per_entry)],
        vec!["Best streak (days)".to_string(), stats.best_streak.to_string()],
        vec!["Current streak (days)".to_string(), stats.current_streak.to_string()],
    ];
    println!("{}", table(&["Statistic", "Value"], rows));
    Ok(())
}
