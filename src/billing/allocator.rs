use chrono::{Datelike, NaiveDate};
use tracing::trace;

use crate::billing::installments::{DueSchedule, InstallmentPlan, DEFAULT_DUE_DAY};
use crate::billing::period::{period_closing_date, period_due_date, BillingPeriod};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::Result;
use crate::models::{Card, PaidStatement};

/// Most recent paid statement of `card` by payment date. Ties go to the
/// later period.
pub fn latest_early_closure<'a>(
    card: &Card,
    paid_statements: &'a [PaidStatement],
) -> Option<&'a PaidStatement> {
    paid_statements
        .iter()
        .filter(|s| s.card_id == card.id)
        .max_by_key(|s| (s.payment_date, s.period))
}

/// Billing period a purchase made on `purchase_date` belongs to.
///
/// A purchase normally lands in the statement closing in its own month when
/// made before the closing day, otherwise in the next one. A statement
/// marked as paid early closes its cycle at the payment date: purchases
/// after that payment and before the next scheduled closing go to the
/// following period.
pub fn assign_period(
    purchase_date: NaiveDate,
    card: &Card,
    paid_statements: &[PaidStatement],
) -> Result<BillingPeriod> {
    if let Some(closure) = latest_early_closure(card, paid_statements) {
        if purchase_date > closure.payment_date {
            let next = closure.period.next();
            let scheduled_closing = period_closing_date(next, card.closing_day)?;
            if purchase_date < scheduled_closing {
                trace!(%purchase_date, closed = %closure.period, period = %next, "early closure applies");
                return Ok(next);
            }
        }
    }

    let own_month = BillingPeriod::of(purchase_date);
    if purchase_date.day() < card.closing_day {
        Ok(own_month)
    } else {
        Ok(own_month.next())
    }
}

/// Installment schedule for a plan, laid out on the card's due day when a
/// card is given and on the calendar otherwise.
pub fn generate_installments(
    principal: Money,
    start_date: NaiveDate,
    count: u32,
    start_index: u32,
    card: Option<&Card>,
) -> Result<InstallmentPlan> {
    let schedule = match card {
        Some(card) => DueSchedule::CardDueDay(card.due_day.unwrap_or(DEFAULT_DUE_DAY)),
        None => DueSchedule::Calendar,
    };
    InstallmentPlan::generate(principal, start_date, count, start_index, schedule, Money::SCALE)
}

/// Billing cycle rules bound to the ledger configuration.
#[derive(Debug, Clone)]
pub struct BillingCycleAllocator {
    default_due_day: u32,
    rounding_dp: u32,
}

impl Default for BillingCycleAllocator {
    fn default() -> Self {
        Self {
            default_due_day: DEFAULT_DUE_DAY,
            rounding_dp: Money::SCALE,
        }
    }
}

impl BillingCycleAllocator {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            default_due_day: config.allocation.default_due_day,
            rounding_dp: config.installments.rounding_dp,
        }
    }

    pub fn assign_period(
        &self,
        purchase_date: NaiveDate,
        card: &Card,
        paid_statements: &[PaidStatement],
    ) -> Result<BillingPeriod> {
        assign_period(purchase_date, card, paid_statements)
    }

    /// due day of `card`, falling back to the configured default
    pub fn due_day(&self, card: &Card) -> u32 {
        card.due_day.unwrap_or(self.default_due_day)
    }

    pub fn closing_date(&self, period: BillingPeriod, card: &Card) -> Result<NaiveDate> {
        period_closing_date(period, card.closing_day)
    }

    pub fn due_date(&self, period: BillingPeriod, card: &Card) -> Result<NaiveDate> {
        period_due_date(period, self.due_day(card))
    }

    pub fn generate_installments(
        &self,
        principal: Money,
        start_date: NaiveDate,
        count: u32,
        start_index: u32,
        card: Option<&Card>,
    ) -> Result<InstallmentPlan> {
        let schedule = match card {
            Some(card) => DueSchedule::CardDueDay(self.due_day(card)),
            None => DueSchedule::Calendar,
        };
        InstallmentPlan::generate(principal, start_date, count, start_index, schedule, self.rounding_dp)
    }
}
