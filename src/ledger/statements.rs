use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{today, Ledger};
use crate::billing::BillingPeriod;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::Event;
use crate::models::{Card, Installment, PaidStatement, Purchase};
use crate::session::SessionProvider;
use crate::store::{Filter, Record, Row, Store, StoreExt};
use crate::types::{CardId, PaymentMethod, UserId};

/// a card's bill for one billing period ("fatura")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub card_id: CardId,
    pub card_name: String,
    pub period: BillingPeriod,
    pub closing_date: NaiveDate,
    pub due_date: NaiveDate,
    /// single purchases allocated to the period
    pub purchases: Vec<Purchase>,
    /// installments falling due with this statement
    pub installments: Vec<Installment>,
    pub total: Money,
    pub paid: Option<PaidStatement>,
}

impl Statement {
    pub fn is_paid(&self) -> bool {
        self.paid.is_some()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// Build the statement of `card_id` for `period`: single purchases the
    /// allocator assigns to the period plus installments due in the month
    /// the statement is due.
    #[instrument(skip(self))]
    pub fn statement(&self, card_id: CardId, period: BillingPeriod) -> Result<Option<Statement>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let card: Card = self.require(user, card_id)?;
        self.build_statement(user, &card, period).map(Some)
    }

    /// Settle a statement. Records the payment (default today) with the
    /// statement total and marks its installments as paid; later purchases
    /// move to the next period until the next scheduled closing.
    #[instrument(skip(self, time_provider))]
    pub fn mark_statement_paid(
        &mut self,
        card_id: CardId,
        period: BillingPeriod,
        payment_date: Option<NaiveDate>,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<PaidStatement>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let card: Card = self.require(user, card_id)?;
        let statement = self.build_statement(user, &card, period)?;
        let payment_date = payment_date.unwrap_or_else(|| today(time_provider));

        if payment_date > statement.due_date {
            warn!(%period, %payment_date, due_date = %statement.due_date, "statement paid after due date");
        }

        let record = PaidStatement::new(user, card.id, period, payment_date, statement.total);
        let paid = self
            .store
            .upsert_record(&record, &["owner_id", "card_id", "year", "month"])?;

        let mut patch = Row::new();
        patch.insert("paid".to_string(), Value::Bool(true));
        patch.insert("paid_date".to_string(), serde_json::to_value(payment_date)?);
        let settled = self
            .store
            .update(Installment::TABLE, &patch, &self.due_installment_filters(user, &card, period)?)?;

        info!(%period, total = %statement.total, settled, "statement paid");
        self.events.emit(Event::StatementPaid {
            card_id,
            period,
            total: statement.total,
            payment_date,
        });
        Ok(Some(paid))
    }

    /// Undo a payment: drops the paid statement and reopens its installments.
    #[instrument(skip(self))]
    pub fn unmark_statement_paid(&mut self, card_id: CardId, period: BillingPeriod) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let card: Card = self.require(user, card_id)?;

        let removed = self.store.delete(
            PaidStatement::TABLE,
            &[
                Filter::eq("owner_id", user),
                Filter::eq("card_id", card.id),
                Filter::eq("year", period.year()),
                Filter::eq("month", period.month()),
            ],
        )?;
        if removed == 0 {
            debug!(%period, "statement was not paid");
            return Ok(0);
        }

        let mut patch = Row::new();
        patch.insert("paid".to_string(), Value::Bool(false));
        patch.insert("paid_date".to_string(), Value::Null);
        self.store
            .update(Installment::TABLE, &patch, &self.due_installment_filters(user, &card, period)?)?;

        self.events.emit(Event::StatementReopened { card_id, period });
        Ok(removed)
    }

    /// paid statements of a card, latest payment first
    pub fn paid_statements(&self, card_id: CardId) -> Result<Vec<PaidStatement>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let query = self
            .owned(user)
            .eq("card_id", card_id)
            .order_by("payment_date", false);
        self.store.fetch(&query)
    }

    /// period a purchase made today on `card_id` would land in
    pub fn current_period(
        &self,
        card_id: CardId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<BillingPeriod>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let card: Card = self.require(user, card_id)?;
        let paid = self.paid_statements_for(user, card.id)?;
        self.allocator
            .assign_period(today(time_provider), &card, &paid)
            .map(Some)
    }

    fn build_statement(&self, user: UserId, card: &Card, period: BillingPeriod) -> Result<Statement> {
        let closing_date = self.allocator.closing_date(period, card)?;
        let due_date = self.allocator.due_date(period, card)?;
        let paid_statements = self.paid_statements_for(user, card.id)?;

        // nothing dated after the closing date can belong to the period
        let candidates: Vec<Purchase> = self.store.fetch(
            &self
                .owned(user)
                .eq("card_id", card.id)
                .eq("payment_method", PaymentMethod::Card)
                .eq("is_installment", false)
                .lte("date", closing_date)
                .order_by("date", true),
        )?;
        let mut purchases = Vec::with_capacity(candidates.len());
        for purchase in candidates {
            if self.allocator.assign_period(purchase.date, card, &paid_statements)? == period {
                purchases.push(purchase);
            }
        }

        let installments: Vec<Installment> = self.store.fetch(
            &self
                .owned(user)
                .eq("card_id", card.id)
                .gte("due_date", period.next().first_day()?)
                .lte("due_date", period.next().last_day()?)
                .order_by("due_date", true),
        )?;

        let total = purchases.iter().map(|p| p.amount).sum::<Money>()
            + installments.iter().map(|i| i.amount).sum::<Money>();
        let paid = paid_statements.into_iter().find(|s| s.period == period);

        Ok(Statement {
            card_id: card.id,
            card_name: card.name.clone(),
            period,
            closing_date,
            due_date,
            purchases,
            installments,
            total,
            paid,
        })
    }

    fn due_installment_filters(&self, user: UserId, card: &Card, period: BillingPeriod) -> Result<Vec<Filter>> {
        let due_month = period.next();
        Ok(vec![
            Filter::eq("owner_id", user),
            Filter::eq("card_id", card.id),
            Filter::gte("due_date", due_month.first_day()?),
            Filter::lte("due_date", due_month.last_day()?),
        ])
    }
}
