use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::Ledger;
use crate::billing::BillingPeriod;
use crate::decimal::Money;
use crate::errors::Result;
use crate::events::Event;
use crate::models::{Card, Installment, NewPurchase, PaidStatement, Purchase};
use crate::session::SessionProvider;
use crate::store::{to_row, Store, StoreExt};
use crate::types::{CardId, PaymentMethod, PurchaseId, UserId};

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// Record a purchase. Purchases bought in installments get their plan
    /// generated and stored along with them.
    #[instrument(skip(self, new), fields(description = %new.description, amount = %new.amount))]
    pub fn record_purchase(&mut self, new: NewPurchase) -> Result<Option<Purchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        new.validate()?;
        let card = self.purchase_card(user, new.card_id)?;

        let purchase = Purchase {
            id: Uuid::new_v4(),
            owner_id: user,
            description: new.description.trim().to_string(),
            amount: new.amount,
            date: new.date,
            category: new.category,
            payment_method: new.payment_method,
            card_id: card.as_ref().map(|c| c.id),
            is_installment: new.installments.is_some(),
            installment_count: new.installments,
        };
        let period = self.period_on_card(&purchase, card.as_ref())?;
        let plan = self.plan_for_purchase(&purchase, card.as_ref(), period)?;

        let purchase = self.store.insert_record(&purchase)?;
        if purchase.is_installment {
            self.store_plan(purchase.id, &plan)?;
        }

        info!(purchase_id = %purchase.id, period = ?period, installments = plan.len(), "purchase recorded");
        self.events.emit(Event::PurchaseRecorded {
            purchase_id: purchase.id,
            amount: purchase.amount,
            date: purchase.date,
            period,
        });
        Ok(Some(purchase))
    }

    /// Replace a purchase's fields. The installment plan is regenerated when
    /// the purchase is (or was) bought in installments.
    #[instrument(skip(self, changes))]
    pub fn update_purchase(
        &mut self,
        purchase_id: PurchaseId,
        changes: NewPurchase,
    ) -> Result<Option<Purchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        changes.validate()?;
        let existing: Purchase = self.require(user, purchase_id)?;
        let card = self.purchase_card(user, changes.card_id)?;

        let purchase = Purchase {
            id: existing.id,
            owner_id: existing.owner_id,
            description: changes.description.trim().to_string(),
            amount: changes.amount,
            date: changes.date,
            category: changes.category,
            payment_method: changes.payment_method,
            card_id: card.as_ref().map(|c| c.id),
            is_installment: changes.installments.is_some(),
            installment_count: changes.installments,
        };
        let period = self.period_on_card(&purchase, card.as_ref())?;
        let plan = self.plan_for_purchase(&purchase, card.as_ref(), period)?;

        self.store.update_record(&purchase)?;
        if existing.is_installment || purchase.is_installment {
            self.store_plan(purchase.id, &plan)?;
        }

        self.events.emit(Event::PurchaseUpdated {
            purchase_id,
            period,
        });
        Ok(Some(purchase))
    }

    /// Delete a purchase together with its installment plan.
    #[instrument(skip(self))]
    pub fn delete_purchase(&mut self, purchase_id: PurchaseId) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let purchase: Purchase = self.require(user, purchase_id)?;

        let installments_removed = self
            .store
            .replace_installment_plan(purchase.id, Vec::new())?
            .removed;
        let deleted = self.store.delete_by_id::<Purchase>(purchase.id)?;

        info!(%purchase_id, installments_removed, "purchase deleted");
        self.events.emit(Event::PurchaseDeleted {
            purchase_id,
            installments_removed,
        });
        Ok(deleted)
    }

    /// purchases dated within `from..=to`, oldest first
    pub fn list_purchases(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Purchase>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let query = self
            .owned(user)
            .gte("date", from)
            .lte("date", to)
            .order_by("date", true);
        self.store.fetch(&query)
    }

    pub fn purchase(&self, purchase_id: PurchaseId) -> Result<Option<Purchase>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let query = self.owned(user).eq("id", purchase_id).limit(1);
        Ok(self.store.fetch::<Purchase>(&query)?.into_iter().next())
    }

    /// Statement period of a stored purchase; None for purchases not made
    /// on a card.
    pub fn purchase_period(&self, purchase_id: PurchaseId) -> Result<Option<BillingPeriod>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let purchase: Purchase = self.require(user, purchase_id)?;
        let card = self.purchase_card(user, purchase.card_id)?;
        self.period_on_card(&purchase, card.as_ref())
    }

    /// paid statements recorded for `card_id`
    pub(super) fn paid_statements_for(&self, user: UserId, card_id: CardId) -> Result<Vec<PaidStatement>> {
        let query = self.owned(user).eq("card_id", card_id);
        self.store.fetch(&query)
    }

    fn purchase_card(&self, user: UserId, card_id: Option<CardId>) -> Result<Option<Card>> {
        card_id.map(|id| self.require::<Card>(user, id)).transpose()
    }

    fn period_on_card(&self, purchase: &Purchase, card: Option<&Card>) -> Result<Option<BillingPeriod>> {
        let Some(card) = card.filter(|_| purchase.payment_method == PaymentMethod::Card) else {
            return Ok(None);
        };
        let paid = self.paid_statements_for(purchase.owner_id, card.id)?;
        self.allocator
            .assign_period(purchase.date, card, &paid)
            .map(Some)
    }

    /// Installments of `purchase`. On a card the first one falls due with
    /// the statement the purchase is allocated to; otherwise on the
    /// purchase date.
    fn plan_for_purchase(
        &self,
        purchase: &Purchase,
        card: Option<&Card>,
        period: Option<BillingPeriod>,
    ) -> Result<Vec<Installment>> {
        let Some(count) = purchase.installment_count.filter(|_| purchase.is_installment) else {
            return Ok(Vec::new());
        };
        let start_date = match (card, period) {
            (Some(card), Some(period)) => self.allocator.due_date(period, card)?,
            _ => purchase.date,
        };

        let plan = self
            .allocator
            .generate_installments(purchase.amount, start_date, count, 1, card)?;
        debug!(count, first_due = %start_date, total = %plan.total(), "installment plan generated");

        Ok(self.plan_records(
            purchase.owner_id,
            Some(purchase.id),
            purchase.card_id,
            &purchase.description,
            purchase.category.as_deref(),
            &plan,
        ))
    }

    fn store_plan(&mut self, purchase_id: PurchaseId, plan: &[Installment]) -> Result<()> {
        let rows = plan.iter().map(to_row).collect::<Result<Vec<_>>>()?;
        let replaced = self.store.replace_installment_plan(purchase_id, rows)?;
        let total: Money = plan.iter().map(|i| i.amount).sum();

        self.events.emit(Event::InstallmentPlanReplaced {
            purchase_id,
            removed: replaced.removed,
            inserted: replaced.inserted.len(),
            total,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::billing::BillingPeriod;
    use crate::decimal::Money;
    use crate::errors::LedgerError;
    use crate::events::Event;
    use crate::models::{NewCard, NewPurchase};
    use crate::store::Table;
    use crate::types::PaymentMethod;
    use rust_decimal_macros::dec;

    #[test]
    fn test_record_cash_purchase() {
        let (mut ledger, user) = ledger();
        let purchase = ledger
            .record_purchase(
                NewPurchase::new("Padaria", Money::from_decimal(dec!(18.50)), date(2024, 3, 2), PaymentMethod::Cash)
                    .category("Mercado"),
            )
            .unwrap()
            .unwrap();

        assert_eq!(purchase.owner_id, user);
        assert!(!purchase.is_installment);
        assert_eq!(ledger.store().len(Table::Installments), 0);
        assert_eq!(ledger.purchase_period(purchase.id).unwrap(), None);
        assert!(matches!(
            ledger.events.events()[0],
            Event::PurchaseRecorded { period: None, .. }
        ));
    }

    #[test]
    fn test_card_purchase_is_allocated() {
        let (mut ledger, _) = ledger();
        let card = ledger.create_card(NewCard::new("Visa", 10, Some(17))).unwrap().unwrap();

        let before = ledger
            .record_purchase(
                NewPurchase::new("Livro", Money::from_major(60), date(2024, 3, 9), PaymentMethod::Card).on_card(card.id),
            )
            .unwrap()
            .unwrap();
        let on_closing = ledger
            .record_purchase(
                NewPurchase::new("Cinema", Money::from_major(40), date(2024, 3, 10), PaymentMethod::Card).on_card(card.id),
            )
            .unwrap()
            .unwrap();

        assert_eq!(ledger.purchase_period(before.id).unwrap(), Some(BillingPeriod::new(2024, 3).unwrap()));
        assert_eq!(ledger.purchase_period(on_closing.id).unwrap(), Some(BillingPeriod::new(2024, 4).unwrap()));
    }

    #[test]
    fn test_purchase_on_unknown_card_is_rejected() {
        let (mut ledger, _) = ledger();
        let result = ledger.record_purchase(
            NewPurchase::new("Livro", Money::from_major(60), date(2024, 3, 9), PaymentMethod::Card)
                .on_card(uuid::Uuid::new_v4()),
        );
        assert!(matches!(result, Err(LedgerError::NotFound { table: Table::Cards, .. })));
        assert_eq!(ledger.store().len(Table::Purchases), 0);
    }

    #[test]
    fn test_installment_purchase_generates_plan() {
        let (mut ledger, _) = ledger();
        let card = ledger.create_card(NewCard::new("Visa", 10, Some(17))).unwrap().unwrap();

        let purchase = ledger
            .record_purchase(
                NewPurchase::new("Geladeira", Money::from_major(100), date(2024, 11, 20), PaymentMethod::Card)
                    .on_card(card.id)
                    .in_installments(3),
            )
            .unwrap()
            .unwrap();

        let plan = ledger.installments_for_purchase(purchase.id).unwrap();
        let amounts: Vec<Money> = plan.iter().map(|i| i.amount).collect();
        assert_eq!(
            amounts,
            vec![
                Money::from_decimal(dec!(33.33)),
                Money::from_decimal(dec!(33.33)),
                Money::from_decimal(dec!(33.34)),
            ]
        );

        // allocated to the December statement, due January 17
        let due: Vec<_> = plan.iter().map(|i| i.due_date).collect();
        assert_eq!(due, vec![date(2025, 1, 17), date(2025, 2, 17), date(2025, 3, 17)]);
        assert_eq!(plan[0].description, "Geladeira 1/3");
        assert_eq!(plan[2].description, "Geladeira 3/3");
        assert!(plan.iter().all(|i| i.card_id == Some(card.id) && !i.paid));
    }

    #[test]
    fn test_installment_purchase_without_card_uses_calendar() {
        let (mut ledger, _) = ledger();
        let purchase = ledger
            .record_purchase(
                NewPurchase::new("Curso", Money::from_major(300), date(2024, 1, 31), PaymentMethod::Pix)
                    .in_installments(2),
            )
            .unwrap()
            .unwrap();

        let plan = ledger.installments_for_purchase(purchase.id).unwrap();
        assert_eq!(plan[0].due_date, date(2024, 1, 31));
        assert_eq!(plan[1].due_date, date(2024, 3, 2));
    }

    #[test]
    fn test_update_purchase_replans_and_clears() {
        let (mut ledger, _) = ledger();
        let card = ledger.create_card(NewCard::new("Visa", 10, Some(17))).unwrap().unwrap();
        let new = NewPurchase::new("TV", Money::from_major(1_200), date(2024, 5, 2), PaymentMethod::Card)
            .on_card(card.id)
            .in_installments(4);
        let purchase = ledger.record_purchase(new.clone()).unwrap().unwrap();
        assert_eq!(ledger.store().len(Table::Installments), 4);

        ledger.update_purchase(purchase.id, new.clone().in_installments(6)).unwrap();
        let plan = ledger.installments_for_purchase(purchase.id).unwrap();
        assert_eq!(plan.len(), 6);
        assert!(plan.iter().all(|i| i.amount == Money::from_major(200)));

        let mut single = new;
        single.installments = None;
        let updated = ledger.update_purchase(purchase.id, single).unwrap().unwrap();
        assert!(!updated.is_installment);
        assert_eq!(ledger.store().len(Table::Installments), 0);

        let replaced: Vec<_> = ledger
            .events
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::InstallmentPlanReplaced { removed, inserted, .. } => Some((*removed, *inserted)),
                _ => None,
            })
            .collect();
        assert_eq!(replaced, vec![(0, 4), (4, 6), (6, 0)]);
    }

    #[test]
    fn test_failed_update_leaves_purchase_untouched() {
        let (mut ledger, _) = ledger();
        let new = NewPurchase::new("TV", Money::from_major(1_200), date(2024, 5, 2), PaymentMethod::Pix).in_installments(4);
        let purchase = ledger.record_purchase(new.clone()).unwrap().unwrap();

        let mut invalid = new;
        invalid.amount = Money::ZERO;
        assert!(ledger.update_purchase(purchase.id, invalid).is_err());

        assert_eq!(ledger.purchase(purchase.id).unwrap().unwrap().amount, Money::from_major(1_200));
        assert_eq!(ledger.installments_for_purchase(purchase.id).unwrap().len(), 4);
    }

    #[test]
    fn test_delete_purchase_removes_plan() {
        let (mut ledger, _) = ledger();
        let kept = ledger
            .record_purchase(
                NewPurchase::new("Sofá", Money::from_major(900), date(2024, 5, 2), PaymentMethod::Pix).in_installments(3),
            )
            .unwrap()
            .unwrap();
        let purchase = ledger
            .record_purchase(
                NewPurchase::new("TV", Money::from_major(1_200), date(2024, 5, 2), PaymentMethod::Pix).in_installments(4),
            )
            .unwrap()
            .unwrap();

        assert_eq!(ledger.delete_purchase(purchase.id).unwrap(), 1);
        assert_eq!(ledger.store().len(Table::Installments), 3);
        assert_eq!(ledger.installments_for_purchase(kept.id).unwrap().len(), 3);
        assert!(matches!(
            ledger.events.events().last(),
            Some(Event::PurchaseDeleted { installments_removed: 4, .. })
        ));
    }

    #[test]
    fn test_list_purchases_by_range() {
        let (mut ledger, _) = ledger();
        for (day, amount) in [(28, 10), (1, 20), (15, 30)] {
            let month = if day == 28 { 2 } else { 3 };
            ledger
                .record_purchase(NewPurchase::new(
                    "Item",
                    Money::from_major(amount),
                    date(2024, month, day),
                    PaymentMethod::Debit,
                ))
                .unwrap();
        }

        let march = ledger.list_purchases(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        let days: Vec<_> = march.iter().map(|p| p.date).collect();
        assert_eq!(days, vec![date(2024, 3, 1), date(2024, 3, 15)]);
    }

    #[test]
    fn test_anonymous_purchase_is_ignored() {
        let mut ledger = anonymous_ledger();
        let result = ledger
            .record_purchase(NewPurchase::new("Item", Money::from_major(5), date(2024, 3, 1), PaymentMethod::Cash))
            .unwrap();
        assert_eq!(result, None);
        assert!(ledger.list_purchases(date(2024, 1, 1), date(2024, 12, 31)).unwrap().is_empty());
        assert!(ledger.store().is_empty());
    }
}
