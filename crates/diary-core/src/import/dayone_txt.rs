//! Day One plain-text export.
//!
//! Records start with `\tDate:\t<day> <month> <year>`, optionally followed
//! by ` at <time>`, then the entry body on the following lines.

use chrono::NaiveDate;

use super::{split_title, ImportedEntry};
use crate::error::{DiaryError, Result};

const RECORD_MARKER: &str = "\tDate:\t";

pub fn parse(contents: &str) -> Result<Vec<ImportedEntry>> {
    contents
        .split(RECORD_MARKER)
        .skip(1)
        .map(|record| {
            let (date_line, body) = record.split_once('\n').unwrap_or((record, ""));
            let date = parse_record_date(date_line)?;
            let (title, text) = split_title(body);
            Ok(ImportedEntry {
                date,
                title,
                text,
                date_created: None,
            })
        })
        .collect()
}

fn parse_record_date(line: &str) -> Result<NaiveDate> {
    let line = line.trim();
    let day = line.split(" at ").next().unwrap_or(line).trim();
    NaiveDate::parse_from_str(day, "%d %B %Y")
        .map_err(|e| DiaryError::Format(format!("Invalid Day One date '{}': {}", day, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let txt = "\tDate:\t15 January 2024 at 14:30:00 GMT\n\nMorning\n\nCoffee first.\n\n\
                   \tDate:\t16 Jan 2024\nSingle line entry\n";

        let entries = parse(txt).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(entries[0].title, "Morning");
        assert_eq!(entries[0].text, "Coffee first.");
        assert_eq!(entries[1].date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(entries[1].title, "Single line entry");
    }

    #[test]
    fn test_record_without_body_is_blank() {
        let entries = parse("\tDate:\t01 March 2024").unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_blank());
    }

    #[test]
    fn test_invalid_date_is_format_error() {
        assert!(matches!(
            parse("\tDate:\t2024-01-15\nbody"),
            Err(DiaryError::Format(_))
        ));
        assert!(matches!(
            parse("\tDate:\t32 January 2024\nbody"),
            Err(DiaryError::Format(_))
        ));
    }

    #[test]
    fn test_no_records() {
        assert!(parse("just some text").unwrap().is_empty());
    }
}
