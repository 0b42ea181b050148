//! Plaintext full-text index in the connection's `temp` schema.
//!
//! The index is never written to the journal file. It is rebuilt from
//! decrypted rows on unlock and disappears when the connection closes.

use rusqlite::Connection;
use uuid::Uuid;

use crate::error::{DiaryError, Result};
use crate::storage::types::{parse_date, SearchHit};
use crate::text::strip_markup;

const CREATE_INDEX: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS temp.entries_fts USING fts5(
        entry_id UNINDEXED,
        date UNINDEXED,
        title,
        content,
        tokenize = 'unicode61 remove_diacritics 2'
    );
"#;

pub(crate) fn create_index(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_INDEX)?;
    Ok(())
}

pub(crate) fn clear_index(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM temp.entries_fts", [])?;
    Ok(())
}

/// Replace the index record for one entry.
pub(crate) fn index_entry(conn: &Connection, id: &Uuid, date: &str, title: &str, text: &str) -> Result<()> {
    remove_entry(conn, id)?;
    conn.execute(
        "INSERT INTO temp.entries_fts (entry_id, date, title, content) VALUES (?1, ?2, ?3, ?4)",
        (id.to_string(), date, title, strip_markup(text)),
    )?;
    Ok(())
}

pub(crate) fn remove_entry(conn: &Connection, id: &Uuid) -> Result<()> {
    conn.execute(
        "DELETE FROM temp.entries_fts WHERE entry_id = ?1",
        [id.to_string()],
    )?;
    Ok(())
}

/// Turn free text into an FTS5 query of quoted prefix terms.
///
/// Returns `None` when nothing searchable is left.
pub(crate) fn build_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .map(|token| format!("\"{}\"*", token.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

pub(crate) fn search(conn: &Connection, query: &str) -> Result<Vec<SearchHit>> {
    let Some(match_query) = build_match_query(query) else {
        return Ok(Vec::new());
    };

    let mut stmt = conn.prepare(
        r#"
        SELECT entry_id, date, title,
               snippet(entries_fts, -1, '<mark>', '</mark>', '…', 12)
        FROM temp.entries_fts
        WHERE entries_fts MATCH ?1
        ORDER BY bm25(entries_fts), date DESC
        "#,
    )?;
    let rows = stmt.query_map([match_query], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut hits = Vec::new();
    for row in rows {
        let (entry_id, date, title, snippet) = row?;
        let entry_id = Uuid::parse_str(&entry_id)
            .map_err(|e| DiaryError::Storage(format!("Invalid indexed UUID: {}", e)))?;
        let date = parse_date(&date)
            .ok_or_else(|| DiaryError::Storage("Invalid indexed date".to_string()))?;
        hits.push(SearchHit {
            entry_id,
            date,
            title,
            snippet,
        });
    }

    Ok(hits)
}

/// Index record counts relative to `entries`: (missing, orphaned).
pub(crate) fn consistency(conn: &Connection) -> Result<(i64, i64)> {
    let missing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries e LEFT JOIN temp.entries_fts f ON e.id = f.entry_id WHERE f.entry_id IS NULL",
        [],
        |row| row.get(0),
    )?;
    let orphaned: i64 = conn.query_row(
        "SELECT COUNT(*) FROM temp.entries_fts f LEFT JOIN entries e ON f.entry_id = e.id WHERE e.id IS NULL",
        [],
        |row| row.get(0),
    )?;
    Ok((missing, orphaned))
}
