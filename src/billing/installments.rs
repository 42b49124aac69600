use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::calendar::{add_months_overflowing, clamped_date, shift_month};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// due day used when a card has none configured
pub const DEFAULT_DUE_DAY: u32 = 15;

/// one dated slice of an installment plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub index: u32,
    pub total: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
}

impl ScheduledInstallment {
    /// "i/N" label appended to generated descriptions
    pub fn label(&self) -> String {
        format!("{}/{}", self.index, self.total)
    }
}

/// how due dates are laid out across months
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueSchedule {
    /// the card's due day each month, clamped to the month length
    CardDueDay(u32),
    /// the start date advanced month by month, day overflowing into the next month
    Calendar,
}

/// installment plan generated from a principal
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentPlan {
    pub principal: Money,
    pub count: u32,
    pub start_index: u32,
    pub start_date: NaiveDate,
    pub installments: Vec<ScheduledInstallment>,
}

impl InstallmentPlan {
    /// Generate installments `start_index..=count` of a plan splitting
    /// `principal` into `count` monthly slices. Slice `start_index` is due
    /// in the month of `start_date`.
    pub fn generate(
        principal: Money,
        start_date: NaiveDate,
        count: u32,
        start_index: u32,
        schedule: DueSchedule,
        rounding_dp: u32,
    ) -> Result<Self> {
        if count == 0 {
            return Err(LedgerError::InvalidPlan {
                message: "installment count must be at least 1".to_string(),
            });
        }
        if !principal.is_positive() {
            return Err(LedgerError::InvalidPlan {
                message: format!("principal must be positive, got {}", principal),
            });
        }
        if start_index == 0 || start_index > count {
            return Err(LedgerError::InvalidPlan {
                message: format!("start index {} outside 1..={}", start_index, count),
            });
        }

        let (base, last) = split_amount(principal, count, rounding_dp)?;

        let installments = (start_index..=count)
            .map(|index| {
                let months_to_add = index - start_index;
                let due_date = match schedule {
                    DueSchedule::CardDueDay(due_day) => {
                        let (year, month) =
                            shift_month(start_date.year(), start_date.month(), months_to_add);
                        clamped_date(year, month, due_day)?
                    }
                    DueSchedule::Calendar => add_months_overflowing(start_date, months_to_add)?,
                };

                Ok(ScheduledInstallment {
                    index,
                    total: count,
                    due_date,
                    amount: if index == count { last } else { base },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            principal,
            count,
            start_index,
            start_date,
            installments,
        })
    }

    /// get installment by its plan index (1-based)
    pub fn get(&self, index: u32) -> Option<&ScheduledInstallment> {
        self.installments.iter().find(|i| i.index == index)
    }

    /// sum of the generated installments
    pub fn total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    /// whether the plan starts at the first installment
    pub fn is_complete(&self) -> bool {
        self.start_index == 1
    }
}

/// Split `principal` into `count` slices: every slice but the last gets the
/// quotient rounded once to `rounding_dp` places, the last absorbs the
/// remainder. The slices always add up to `principal`; with very small
/// principals the last one may come out zero or negative.
pub fn split_amount(principal: Money, count: u32, rounding_dp: u32) -> Result<(Money, Money)> {
    if count == 0 {
        return Err(LedgerError::InvalidPlan {
            message: "installment count must be at least 1".to_string(),
        });
    }

    let quotient = principal.as_decimal() / Decimal::from(count);
    let base = Money::from_decimal(
        quotient.round_dp_with_strategy(rounding_dp.min(Money::SCALE), RoundingStrategy::MidpointAwayFromZero),
    );
    let last = principal - base * Decimal::from(count - 1);

    Ok((base, last))
}
