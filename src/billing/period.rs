use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calendar::{clamped_date, days_in_month, shift_month};
use crate::errors::{LedgerError, Result};

/// A monthly billing period ("fatura"), identified by the month in which it
/// closes. Months are 1-12; `month0` gives the 0-11 form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidDate {
                message: format!("month {} is outside 1-12", month),
            });
        }
        Ok(Self { year, month })
    }

    /// build from a zero-based month (0 = January)
    pub fn from_month0(month0: u32, year: i32) -> Result<Self> {
        Self::new(year, month0 + 1)
    }

    /// the calendar month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month0(&self) -> u32 {
        self.month - 1
    }

    pub fn plus_months(&self, months: u32) -> Self {
        let (year, month) = shift_month(self.year, self.month, months);
        Self { year, month }
    }

    pub fn next(&self) -> Self {
        self.plus_months(1)
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn first_day(&self) -> Result<NaiveDate> {
        clamped_date(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Result<NaiveDate> {
        clamped_date(self.year, self.month, days_in_month(self.year, self.month))
    }

    /// whether `date` falls inside this calendar month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

/// Closing date of `period`: the configured closing day, clamped to the
/// length of the period's month.
pub fn period_closing_date(period: BillingPeriod, closing_day: u32) -> Result<NaiveDate> {
    clamped_date(period.year, period.month, closing_day)
}

/// Due date of the statement closing in `closing_period`: always in the
/// following month, with the same clamping.
pub fn period_due_date(closing_period: BillingPeriod, due_day: u32) -> Result<NaiveDate> {
    let due_month = closing_period.next();
    clamped_date(due_month.year, due_month.month, due_day)
}
