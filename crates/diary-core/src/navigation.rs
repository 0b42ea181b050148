//! Calendar navigation. Pure date arithmetic with no storage access.

use std::collections::BTreeSet;
use std::ops::Bound;

use chrono::{Days, Local, Months, NaiveDate};

use crate::error::{DiaryError, Result};

pub fn previous_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(1))
        .ok_or_else(|| out_of_range("previous day"))
}

pub fn next_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(1))
        .ok_or_else(|| out_of_range("next day"))
}

/// Same day one month earlier, clamped to the last day of that month.
pub fn previous_month(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_months(Months::new(1))
        .ok_or_else(|| out_of_range("previous month"))
}

/// Same day one month later, clamped to the last day of that month.
pub fn next_month(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(1))
        .ok_or_else(|| out_of_range("next month"))
}

/// Today in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Closest date before `date` that has an entry.
pub fn previous_entry_date(dates: &BTreeSet<NaiveDate>, date: NaiveDate) -> Option<NaiveDate> {
    dates.range(..date).next_back().copied()
}

/// Closest date after `date` that has an entry.
pub fn next_entry_date(dates: &BTreeSet<NaiveDate>, date: NaiveDate) -> Option<NaiveDate> {
    dates
        .range((Bound::Excluded(date), Bound::Unbounded))
        .next()
        .copied()
}

fn out_of_range(step: &str) -> DiaryError {
    DiaryError::InvalidInput(format!("Cannot navigate to {}", step))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_day_steps_cross_boundaries() {
        assert_eq!(previous_day(d(2024, 3, 1)).unwrap(), d(2024, 2, 29));
        assert_eq!(next_day(d(2023, 12, 31)).unwrap(), d(2024, 1, 1));
    }

    #[test]
    fn test_month_steps_clamp() {
        assert_eq!(previous_month(d(2024, 3, 31)).unwrap(), d(2024, 2, 29));
        assert_eq!(next_month(d(2024, 1, 31)).unwrap(), d(2024, 2, 29));
        assert_eq!(next_month(d(2023, 1, 31)).unwrap(), d(2023, 2, 28));
        assert_eq!(previous_month(d(2024, 1, 15)).unwrap(), d(2023, 12, 15));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            next_day(NaiveDate::MAX),
            Err(DiaryError::InvalidInput(_))
        ));
        assert!(previous_month(NaiveDate::MIN).is_err());
    }

    #[test]
    fn test_entry_date_neighbours() {
        let dates: BTreeSet<_> = [d(2024, 1, 1), d(2024, 1, 5), d(2024, 2, 1)].into();

        assert_eq!(previous_entry_date(&dates, d(2024, 1, 5)), Some(d(2024, 1, 1)));
        assert_eq!(next_entry_date(&dates, d(2024, 1, 5)), Some(d(2024, 2, 1)));
        assert_eq!(next_entry_date(&dates, d(2024, 1, 2)), Some(d(2024, 1, 5)));
        assert_eq!(previous_entry_date(&dates, d(2024, 1, 1)), None);
        assert_eq!(next_entry_date(&dates, d(2024, 2, 1)), None);
    }
}
