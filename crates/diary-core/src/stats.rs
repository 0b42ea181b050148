//! Writing statistics over the entries of an unlocked journal.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::DiaryEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_entries: usize,
    pub total_words: u64,
    pub entries_per_week: f64,
    pub avg_words_per_entry: f64,

    /// Longest run of consecutive days with an entry
    pub best_streak: u32,

    /// Run ending today or yesterday, else 0
    pub current_streak: u32,
}

/// Compute statistics as of `today`.
pub fn compute(entries: &[DiaryEntry], today: NaiveDate) -> Statistics {
    let total_entries = entries.len();
    let total_words: u64 = entries.iter().map(|entry| u64::from(entry.word_count)).sum();
    let dates: BTreeSet<NaiveDate> = entries.iter().map(|entry| entry.date).collect();

    let avg_words_per_entry = if total_entries > 0 {
        total_words as f64 / total_entries as f64
    } else {
        0.0
    };

    let entries_per_week = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) if first != last => {
            let weeks = ((*last - *first).num_days() as f64 / 7.0).max(1.0);
            total_entries as f64 / weeks
        }
        _ => total_entries as f64,
    };

    Statistics {
        total_entries,
        total_words,
        entries_per_week,
        avg_words_per_entry,
        best_streak: best_streak(&dates),
        current_streak: current_streak(&dates, today),
    }
}

fn best_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        run = match previous {
            Some(prev) if (date - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(date);
    }
    best
}

fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&last) = dates.last() else {
        return 0;
    };
    if (today - last).num_days() > 1 {
        return 0;
    }

    let mut streak = 0;
    let mut expected = last;
    for &date in dates.iter().rev() {
        if date != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(date: &str, word_count: u32) -> DiaryEntry {
        DiaryEntry {
            id: Uuid::now_v7(),
            date: crate::storage::parse_date(date).unwrap(),
            title: String::new(),
            text: String::new(),
            word_count,
            date_created: Utc::now(),
            date_updated: Utc::now(),
        }
    }

    fn day(value: &str) -> NaiveDate {
        crate::storage::parse_date(value).unwrap()
    }

    #[test]
    fn test_empty() {
        let stats = compute(&[], day("2024-01-10"));
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.best_streak, 0);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.avg_words_per_entry, 0.0);
    }

    #[test]
    fn test_streaks_use_distinct_days() {
        let entries = vec![
            entry("2024-01-01", 10),
            entry("2024-01-02", 20),
            entry("2024-01-02", 5),
            entry("2024-01-03", 0),
            entry("2024-01-08", 3),
            entry("2024-01-09", 2),
        ];

        let stats = compute(&entries, day("2024-01-10"));
        assert_eq!(stats.total_entries, 6);
        assert_eq!(stats.total_words, 40);
        assert_eq!(stats.best_streak, 3);
        assert_eq!(stats.current_streak, 2);

        let stale = compute(&entries, day("2024-01-12"));
        assert_eq!(stale.current_streak, 0);
    }

    #[test]
    fn test_entries_per_week() {
        let entries = vec![entry("2024-01-01", 1), entry("2024-01-15", 1), entry("2024-01-29", 1)];
        let stats = compute(&entries, day("2024-02-01"));
        assert!((stats.entries_per_week - 0.75).abs() < f64::EPSILON);
    }
}
