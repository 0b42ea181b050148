//! Tables and JSON output.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

use diary_core::storage::format_date;
use diary_core::text::strip_markup;
use diary_core::DiaryEntry;

const SUMMARY_MAX: usize = 60;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.to_vec());
    for row in rows {
        table.add_row(row);
    }
    table.to_string()
}

pub fn entry_rows(entries: &[DiaryEntry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|entry| {
            vec![
                format_date(entry.date),
                entry.title.clone(),
                summary(&entry.text),
                entry.word_count.to_string(),
                entry.id.to_string(),
            ]
        })
        .collect()
}

pub const ENTRY_HEADERS: &[&str] = &["Date", "Title", "Text", "Words", "ID"];

pub fn print_entry(entry: &DiaryEntry) {
    println!("{}  {}", format_date(entry.date), entry.title);
    println!("ID: {}", entry.id);
    println!();
    println!("{}", strip_markup(&entry.text));
}

/// Plain text on one line, shortened to fit a table cell.
pub fn summary(markup: &str) -> String {
    let line = strip_markup(markup)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if line.chars().count() > SUMMARY_MAX {
        let cut: String = line.chars().take(SUMMARY_MAX - 1).collect();
        format!("{}…", cut)
    } else {
        line
    }
}
