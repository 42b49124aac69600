//! Month arithmetic shared by the billing cycle and the ledger.

use chrono::{Datelike, Duration, NaiveDate};

use crate::errors::{LedgerError, Result};

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// check a configured day-of-month (closing, due, recurring day)
pub fn validate_day(day: u32) -> Result<u32> {
    if (1..=31).contains(&day) {
        Ok(day)
    } else {
        Err(LedgerError::InvalidDay { day })
    }
}

/// `day` of the given month, clamped to the month length
pub fn clamped_date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| LedgerError::InvalidDate {
        message: format!("{:04}-{:02}-{:02} is out of range", year, month, day),
    })
}

/// (year, month) shifted forward by `months`, rolling the year every 12 months
pub fn shift_month(year: i32, month: u32, months: u32) -> (i32, u32) {
    let zero_based = month.saturating_sub(1) + months;
    (year + (zero_based / 12) as i32, zero_based % 12 + 1)
}

/// Advance `date` by whole months the way a calendar increment does: the
/// day-of-month is kept and overflows into the following month when the
/// target month is shorter (Jan 31 + 1 month = Mar 2 or Mar 3).
pub fn add_months_overflowing(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    let (year, month) = shift_month(date.year(), date.month(), months);
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_signed(Duration::days(date.day() as i64 - 1)))
        .ok_or_else(|| LedgerError::InvalidDate {
            message: format!("{} plus {} months is out of range", date, months),
        })
}

/// Parse `YYYY-MM-DD` or `DD/MM/YYYY`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d/%m/%Y"))
        .map_err(|_| LedgerError::InvalidDate {
            message: format!("unrecognised date '{}'", input),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_clamped_date() {
        assert_eq!(clamped_date(2023, 2, 31).unwrap(), date(2023, 2, 28));
        assert_eq!(clamped_date(2024, 2, 31).unwrap(), date(2024, 2, 29));
        assert_eq!(clamped_date(2024, 4, 31).unwrap(), date(2024, 4, 30));
        assert_eq!(clamped_date(2024, 5, 10).unwrap(), date(2024, 5, 10));
        assert!(clamped_date(2024, 13, 1).is_err());
    }

    #[test]
    fn test_shift_month() {
        assert_eq!(shift_month(2024, 1, 0), (2024, 1));
        assert_eq!(shift_month(2024, 11, 1), (2024, 12));
        assert_eq!(shift_month(2024, 12, 1), (2025, 1));
        assert_eq!(shift_month(2024, 6, 18), (2025, 12));
        assert_eq!(shift_month(2024, 6, 19), (2026, 1));
    }

    #[test]
    fn test_add_months_overflowing() {
        assert_eq!(add_months_overflowing(date(2024, 1, 15), 1).unwrap(), date(2024, 2, 15));
        assert_eq!(add_months_overflowing(date(2024, 1, 31), 1).unwrap(), date(2024, 3, 2));
        assert_eq!(add_months_overflowing(date(2023, 1, 31), 1).unwrap(), date(2023, 3, 3));
        assert_eq!(add_months_overflowing(date(2024, 12, 5), 2).unwrap(), date(2025, 2, 5));
    }

    #[test]
    fn test_validate_day() {
        assert_eq!(validate_day(1).unwrap(), 1);
        assert_eq!(validate_day(31).unwrap(), 31);
        assert!(matches!(validate_day(0), Err(LedgerError::InvalidDay { day: 0 })));
        assert!(validate_day(32).is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-18").unwrap(), date(2024, 3, 18));
        assert_eq!(parse_date("18/03/2024").unwrap(), date(2024, 3, 18));
        assert!(matches!(parse_date("2024-02-30"), Err(LedgerError::InvalidDate { .. })));
        assert!(parse_date("yesterday").is_err());
    }
}
