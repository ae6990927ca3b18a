use chrono::{Datelike, Days, Months, NaiveDate};
use std::ops::Range;

pub const MONTHS_PER_YEAR: usize = 12;

/// Plan year (1-based) that a 1-based absolute month belongs to.
///
/// Months 1..=12 are year 1, 13..=24 year 2, and so on.
pub fn plan_year(month: usize) -> usize {
    month.saturating_sub(1) / MONTHS_PER_YEAR + 1
}

/// Absolute plan month (1-based) for a month (1..=12) within a plan year (1-based).
///
/// `None` for year 0 or when the month number does not fit in `usize`.
pub fn absolute_month(year: usize, month_of_year: usize) -> Option<usize> {
    year.checked_sub(1)?
        .checked_mul(MONTHS_PER_YEAR)?
        .checked_add(month_of_year)
}

/// Row range `[start, start + len)` clipped to `[0, limit)`.
///
/// Windows that begin at or after `limit` come back empty.
pub fn clamp_window(start: usize, len: usize, limit: usize) -> Range<usize> {
    let begin = start.min(limit);
    let end = start.saturating_add(len).min(limit);
    begin..end
}

/// Zero-based destination rows in a horizon-long series for a template of
/// `template_len` rows whose first row lands on the 1-based month `start_month`.
///
/// Returns `None` when the sale starts after the horizon.
pub fn shifted_overlap(start_month: usize, template_len: usize, horizon: usize) -> Option<Range<usize>> {
    if start_month == 0 || start_month > horizon {
        return None;
    }
    let window = clamp_window(start_month - 1, template_len, horizon);
    if window.is_empty() {
        None
    } else {
        Some(window)
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.checked_sub_days(Days::new(1))
}

/// Month-end calendar date of a 1-based plan month, given the date plan month 1 falls in.
pub fn plan_month_end(plan_start: NaiveDate, month: usize) -> Option<NaiveDate> {
    let offset = u32::try_from(month.checked_sub(1)?).ok()?;
    let first = NaiveDate::from_ymd_opt(plan_start.year(), plan_start.month(), 1)?;
    let shifted = first.checked_add_months(Months::new(offset))?;
    last_day_of_month(shifted.year(), shifted.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_year() {
        assert_eq!(plan_year(1), 1);
        assert_eq!(plan_year(12), 1);
        assert_eq!(plan_year(13), 2);
        assert_eq!(plan_year(24), 2);
        assert_eq!(plan_year(25), 3);
    }

    #[test]
    fn test_absolute_month() {
        assert_eq!(absolute_month(1, 1), Some(1));
        assert_eq!(absolute_month(1, 12), Some(12));
        assert_eq!(absolute_month(3, 2), Some(26));
        assert_eq!(absolute_month(0, 5), None);
        assert_eq!(absolute_month(usize::MAX / 2, 1), None);
    }

    #[test]
    fn test_clamp_window() {
        assert_eq!(clamp_window(2, 3, 10), 2..5);
        assert_eq!(clamp_window(8, 5, 10), 8..10);
        assert!(clamp_window(12, 5, 10).is_empty());
        assert!(clamp_window(3, 0, 10).is_empty());
        assert_eq!(clamp_window(0, usize::MAX, 4), 0..4);
    }

    #[test]
    fn test_shifted_overlap() {
        assert_eq!(shifted_overlap(1, 12, 12), Some(0..12));
        assert_eq!(shifted_overlap(12, 12, 12), Some(11..12));
        assert_eq!(shifted_overlap(13, 12, 12), None);
        assert_eq!(shifted_overlap(0, 12, 12), None);
        assert_eq!(shifted_overlap(5, 2, 12), Some(4..6));
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2023, 2),
            NaiveDate::from_ymd_opt(2023, 2, 28)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            last_day_of_month(2023, 12),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
    }

    #[test]
    fn test_plan_month_end() {
        let start = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        assert_eq!(plan_month_end(start, 1), NaiveDate::from_ymd_opt(2025, 11, 30));
        assert_eq!(plan_month_end(start, 2), NaiveDate::from_ymd_opt(2025, 12, 31));
        assert_eq!(plan_month_end(start, 4), NaiveDate::from_ymd_opt(2026, 2, 28));
        assert_eq!(plan_month_end(start, 0), None);
    }
}
