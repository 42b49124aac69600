use hourglass_rs::SafeTimeProvider;
use std::collections::HashSet;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{today, Ledger};
use crate::billing::BillingPeriod;
use crate::calendar::clamped_date;
use crate::errors::Result;
use crate::events::Event;
use crate::models::{Card, NewRecurring, Purchase, RecurringMaterialization, RecurringPurchase};
use crate::session::SessionProvider;
use crate::store::{Filter, Record, Store, StoreExt};
use crate::types::{RecurringId, UserId};

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    #[instrument(skip(self, new), fields(description = %new.description))]
    pub fn create_recurring(&mut self, new: NewRecurring) -> Result<Option<RecurringPurchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        new.validate()?;
        self.check_recurring_card(user, &new)?;

        let recurring = RecurringPurchase {
            id: Uuid::new_v4(),
            owner_id: user,
            description: new.description.trim().to_string(),
            amount: new.amount,
            category: new.category,
            payment_method: new.payment_method,
            card_id: new.card_id,
            day_of_month: new.day_of_month,
            active: true,
        };
        let recurring = self.store.insert_record(&recurring)?;

        self.events.emit(Event::RecurringCreated {
            recurring_id: recurring.id,
            description: recurring.description.clone(),
        });
        Ok(Some(recurring))
    }

    /// replace a template's fields, keeping its active flag
    #[instrument(skip(self, changes))]
    pub fn update_recurring(
        &mut self,
        recurring_id: RecurringId,
        changes: NewRecurring,
    ) -> Result<Option<RecurringPurchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        changes.validate()?;
        self.check_recurring_card(user, &changes)?;

        let mut recurring: RecurringPurchase = self.require(user, recurring_id)?;
        recurring.description = changes.description.trim().to_string();
        recurring.amount = changes.amount;
        recurring.category = changes.category;
        recurring.payment_method = changes.payment_method;
        recurring.card_id = changes.card_id;
        recurring.day_of_month = changes.day_of_month;
        self.store.update_record(&recurring)?;

        self.events.emit(Event::RecurringUpdated { recurring_id });
        Ok(Some(recurring))
    }

    /// pause or resume a template
    pub fn set_recurring_active(
        &mut self,
        recurring_id: RecurringId,
        active: bool,
    ) -> Result<Option<RecurringPurchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let mut recurring: RecurringPurchase = self.require(user, recurring_id)?;
        recurring.active = active;
        self.store.update_record(&recurring)?;

        self.events.emit(Event::RecurringUpdated { recurring_id });
        Ok(Some(recurring))
    }

    /// Delete a template. Purchases it already produced are kept.
    #[instrument(skip(self))]
    pub fn delete_recurring(&mut self, recurring_id: RecurringId) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let recurring: RecurringPurchase = self.require(user, recurring_id)?;

        self.store.delete(
            RecurringMaterialization::TABLE,
            &[Filter::eq("owner_id", user), Filter::eq("recurring_id", recurring.id)],
        )?;
        let deleted = self.store.delete_by_id::<RecurringPurchase>(recurring.id)?;

        self.events.emit(Event::RecurringDeleted { recurring_id });
        Ok(deleted)
    }

    pub fn list_recurring(&self) -> Result<Vec<RecurringPurchase>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        self.store
            .fetch(&self.owned(user).order_by("day_of_month", true))
    }

    /// active templates that have not produced their purchase for `period`
    pub fn pending_recurring(&self, period: BillingPeriod) -> Result<Vec<RecurringPurchase>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let done: HashSet<RecurringId> = self
            .store
            .fetch::<RecurringMaterialization>(
                &self
                    .owned(user)
                    .eq("year", period.year())
                    .eq("month", period.month()),
            )?
            .into_iter()
            .map(|m| m.recurring_id)
            .collect();

        let active: Vec<RecurringPurchase> = self
            .store
            .fetch(&self.owned(user).eq("active", true).order_by("day_of_month", true))?;
        Ok(active.into_iter().filter(|r| !done.contains(&r.id)).collect())
    }

    /// Create this month's purchase for every pending template, dated on the
    /// template's day clamped to the month. Running it again for the same
    /// period creates nothing.
    #[instrument(skip(self))]
    pub fn materialize_recurring(&mut self, period: BillingPeriod) -> Result<Vec<Purchase>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };

        let mut created = Vec::new();
        for recurring in self.pending_recurring(period)? {
            let purchase = Purchase {
                id: Uuid::new_v4(),
                owner_id: user,
                description: recurring.description.clone(),
                amount: recurring.amount,
                date: clamped_date(period.year(), period.month(), recurring.day_of_month)?,
                category: recurring.category.clone(),
                payment_method: recurring.payment_method,
                card_id: recurring.card_id,
                is_installment: false,
                installment_count: None,
            };
            let purchase = self.store.insert_record(&purchase)?;

            let entry = RecurringMaterialization {
                id: Uuid::new_v4(),
                owner_id: user,
                recurring_id: recurring.id,
                period,
                purchase_id: purchase.id,
            };
            self.store
                .upsert_record(&entry, &["recurring_id", "year", "month"])?;

            self.events.emit(Event::RecurringMaterialized {
                recurring_id: recurring.id,
                purchase_id: purchase.id,
                period,
            });
            created.push(purchase);
        }

        info!(%period, created = created.len(), "recurring purchases materialized");
        Ok(created)
    }

    /// materialize the month containing today
    pub fn materialize_current_month(&mut self, time_provider: &SafeTimeProvider) -> Result<Vec<Purchase>> {
        self.materialize_recurring(BillingPeriod::of(today(time_provider)))
    }

    fn check_recurring_card(&self, user: UserId, recurring: &NewRecurring) -> Result<()> {
        if let Some(card_id) = recurring.card_id {
            self.require::<Card>(user, card_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::decimal::Money;
    use crate::errors::LedgerError;
    use crate::models::NewCard;
    use crate::store::Table;
    use crate::types::PaymentMethod;

    fn streaming(card_id: Option<Uuid>, day: u32) -> NewRecurring {
        NewRecurring {
            description: "Streaming".to_string(),
            amount: Money::from_decimal(rust_decimal_macros::dec!(39.90)),
            category: Some("Assinaturas".to_string()),
            payment_method: if card_id.is_some() { PaymentMethod::Card } else { PaymentMethod::Pix },
            card_id,
            day_of_month: day,
        }
    }

    #[test]
    fn test_materialize_creates_one_purchase_per_month() {
        let (mut ledger, _) = ledger();
        let card = ledger.create_card(NewCard::new("Visa", 10, None)).unwrap().unwrap();
        let recurring = ledger.create_recurring(streaming(Some(card.id), 31)).unwrap().unwrap();
        ledger.create_recurring(streaming(None, 5)).unwrap();

        let february = BillingPeriod::new(2023, 2).unwrap();
        assert_eq!(ledger.pending_recurring(february).unwrap().len(), 2);

        let created = ledger.materialize_recurring(february).unwrap();
        assert_eq!(created.len(), 2);
        let on_card = created.iter().find(|p| p.card_id == Some(card.id)).unwrap();
        assert_eq!(on_card.date, date(2023, 2, 28));
        assert_eq!(on_card.amount, recurring.amount);

        // running again is a no-op
        assert!(ledger.pending_recurring(february).unwrap().is_empty());
        assert!(ledger.materialize_recurring(february).unwrap().is_empty());
        assert_eq!(ledger.store().len(Table::Purchases), 2);
        assert_eq!(ledger.store().len(Table::RecurringMaterializations), 2);

        // the next month is pending again
        assert_eq!(ledger.pending_recurring(february.next()).unwrap().len(), 2);
    }

    #[test]
    fn test_inactive_templates_are_skipped() {
        let (mut ledger, _) = ledger();
        let recurring = ledger.create_recurring(streaming(None, 5)).unwrap().unwrap();
        ledger.set_recurring_active(recurring.id, false).unwrap();

        let time = time_at(2024, 6, 1);
        assert!(ledger.materialize_current_month(&time).unwrap().is_empty());

        ledger.set_recurring_active(recurring.id, true).unwrap();
        let created = ledger.materialize_current_month(&time).unwrap();
        assert_eq!(created[0].date, date(2024, 6, 5));
    }

    #[test]
    fn test_update_and_delete_recurring() {
        let (mut ledger, _) = ledger();
        let recurring = ledger.create_recurring(streaming(None, 5)).unwrap().unwrap();
        ledger.materialize_recurring(BillingPeriod::new(2024, 1).unwrap()).unwrap();

        let mut changes = streaming(None, 12);
        changes.amount = Money::from_major(45);
        let updated = ledger.update_recurring(recurring.id, changes).unwrap().unwrap();
        assert_eq!(updated.day_of_month, 12);
        assert!(updated.active);

        assert_eq!(ledger.delete_recurring(recurring.id).unwrap(), 1);
        assert!(ledger.list_recurring().unwrap().is_empty());
        assert_eq!(ledger.store().len(Table::RecurringMaterializations), 0);
        assert_eq!(ledger.store().len(Table::Purchases), 1);
    }

    #[test]
    fn test_recurring_validation() {
        let (mut ledger, _) = ledger();
        let mut on_card = streaming(None, 5);
        on_card.payment_method = PaymentMethod::Card;
        assert!(matches!(ledger.create_recurring(on_card), Err(LedgerError::CardRequired)));
        assert!(matches!(
            ledger.create_recurring(streaming(None, 0)),
            Err(LedgerError::InvalidDay { day: 0 })
        ));
        assert!(matches!(
            ledger.create_recurring(streaming(Some(Uuid::new_v4()), 5)),
            Err(LedgerError::NotFound { table: Table::Cards, .. })
        ));
        assert_eq!(ledger.store().len(Table::RecurringPurchases), 0);
    }
}
