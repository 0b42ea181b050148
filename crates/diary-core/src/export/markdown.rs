//! Markdown export.
//!
//! Entries are grouped under a `## YYYY-MM-DD` heading per day. A day with
//! one entry shows its title in bold; a day with several gives each a
//! `###` heading, falling back to `Entry N` when the title is empty.

use std::path::Path;

use tracing::info;

use super::ExportResult;
use crate::error::Result;
use crate::storage::{format_date, DiaryEntry};
use crate::text::{decode_entities, tag_name};

const DOCUMENT_TITLE: &str = "# Diary\n";

/// Render entries as one markdown document. `entries` must be in date order.
pub fn to_markdown(entries: &[DiaryEntry]) -> String {
    let mut output = String::from(DOCUMENT_TITLE);

    for day in entries.chunk_by(|a, b| a.date == b.date) {
        output.push_str(&format!("\n## {}\n", format_date(day[0].date)));
        let several = day.len() > 1;

        for (index, entry) in day.iter().enumerate() {
            if several {
                let heading = if entry.title.trim().is_empty() {
                    format!("Entry {}", index + 1)
                } else {
                    entry.title.clone()
                };
                output.push_str(&format!("### {}\n", heading));
            } else if !entry.title.trim().is_empty() {
                output.push_str(&format!("**{}**\n", entry.title));
            }

            let body = html_to_markdown(&entry.text);
            if !body.is_empty() {
                output.push_str(&body);
                output.push('\n');
            }
            if several && index + 1 < day.len() {
                output.push('\n');
            }
        }
    }

    output
}

/// Write entries to `path` as markdown, with owner-only permissions.
pub fn export_markdown(entries: &[DiaryEntry], path: &Path) -> Result<ExportResult> {
    let document = zeroize::Zeroizing::new(to_markdown(entries));
    crate::fs::write_atomic(path, document.as_bytes(), true)?;

    info!(entries = entries.len(), "Exported journal as markdown");
    Ok(ExportResult {
        entries_exported: entries.len(),
        file_path: path.to_path_buf(),
    })
}

/// Convert the editor's HTML to markdown.
///
/// Headings are shifted down two levels so they sit below the day
/// headings. Unknown tags are dropped and their text kept.
pub fn html_to_markdown(html: &str) -> String {
    let mut renderer = Renderer::default();
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        renderer.text(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                renderer.tag(&after[..end]);
                rest = &after[end + 1..];
            }
            None => {
                renderer.push("<");
                rest = after;
            }
        }
    }
    renderer.text(rest);
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    out: String,

    /// Open blockquotes, each rendered on its own and prefixed on close
    quotes: Vec<String>,

    /// Open lists; `Some(n)` is an ordered list at item `n`
    lists: Vec<Option<usize>>,
    in_pre: bool,
}

impl Renderer {
    fn buffer(&mut self) -> &mut String {
        match self.quotes.last_mut() {
            Some(quote) => quote,
            None => &mut self.out,
        }
    }

    fn push(&mut self, text: &str) {
        self.buffer().push_str(text);
    }

    fn text(&mut self, raw: &str) {
        if !raw.is_empty() {
            self.push(&decode_entities(raw));
        }
    }

    /// Start a new line unless already at the start of one.
    fn line_break(&mut self) {
        let buffer = self.buffer();
        if !buffer.is_empty() && !buffer.ends_with('\n') {
            buffer.push('\n');
        }
    }

    fn tag(&mut self, tag: &str) {
        let (name, closing) = tag_name(tag);
        match (name.as_str(), closing) {
            ("br", _) => self.push("\n"),
            ("p", true) => self.push("\n\n"),
            ("strong" | "b", _) => self.push("**"),
            ("em" | "i", _) => self.push("*"),
            ("s" | "del" | "strike", _) => self.push("~~"),
            ("code", _) if !self.in_pre => self.push("`"),
            ("pre", _) => {
                self.line_break();
                self.push("```\n");
                self.in_pre = !closing;
            }
            ("hr", _) => {
                self.line_break();
                self.push("---\n");
            }
            ("ul", false) => {
                self.line_break();
                self.lists.push(None);
            }
            ("ol", false) => {
                self.line_break();
                self.lists.push(Some(0));
            }
            ("ul" | "ol", true) => {
                self.lists.pop();
                self.push("\n");
            }
            ("li", false) => {
                self.line_break();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        *number += 1;
                        format!("{}. ", number)
                    }
                    _ => "- ".to_string(),
                };
                self.push(&marker);
            }
            ("li", true) => self.line_break(),
            ("blockquote", false) => self.quotes.push(String::new()),
            ("blockquote", true) => {
                if let Some(quoted) = self.quotes.pop() {
                    self.close_quote(&quoted);
                }
            }
            (name, false) => {
                if let Some(level) = heading_level(name) {
                    self.line_break();
                    let hashes = "#".repeat((level + 2).min(6));
                    self.push(&format!("{} ", hashes));
                }
            }
            (name, true) => {
                if heading_level(name).is_some() {
                    self.push("\n\n");
                }
            }
        }
    }

    fn close_quote(&mut self, quoted: &str) {
        self.line_break();
        for line in quoted.lines().map(str::trim).filter(|line| !line.is_empty()) {
            self.push(&format!("> {}\n", line));
        }
        self.push("\n");
    }

    fn finish(mut self) -> String {
        // Unclosed quotes keep their text
        while let Some(quoted) = self.quotes.pop() {
            self.close_quote(&quoted);
        }

        let mut out = self.out;
        while out.contains("\n\n\n") {
            out = out.replace("\n\n\n", "\n\n");
        }
        out.trim().to_string()
    }
}

fn heading_level(name: &str) -> Option<usize> {
    let level: usize = name.strip_prefix('h')?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
