use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{today, Ledger};
use crate::billing::InstallmentPlan;
use crate::errors::Result;
use crate::events::Event;
use crate::models::{Card, Installment, NewInstallmentPlan};
use crate::session::SessionProvider;
use crate::store::{Store, StoreExt};
use crate::types::{CardId, InstallmentId, PurchaseId, UserId};

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// Register a plan that started before it was tracked here. Only the
    /// installments from `start_index` on are created.
    #[instrument(skip(self, plan), fields(description = %plan.description, count = plan.count))]
    pub fn create_installment_in_progress(
        &mut self,
        plan: NewInstallmentPlan,
    ) -> Result<Option<Vec<Installment>>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let card = plan
            .card_id
            .map(|id| self.require::<Card>(user, id))
            .transpose()?;

        let generated = self.allocator.generate_installments(
            plan.total_amount,
            plan.start_date,
            plan.count,
            plan.start_index,
            card.as_ref(),
        )?;
        let records = self.plan_records(
            user,
            None,
            card.as_ref().map(|c| c.id),
            plan.description.trim(),
            plan.category.as_deref(),
            &generated,
        );
        let inserted = self.store.insert_records(&records)?;

        info!(created = inserted.len(), start_index = plan.start_index, "installment plan in progress registered");
        self.events.emit(Event::InstallmentPlanCreated {
            description: plan.description,
            count: plan.count,
            start_index: plan.start_index,
            total: generated.total(),
        });
        Ok(Some(inserted))
    }

    /// mark an installment as paid today, or clear its payment
    #[instrument(skip(self, time_provider))]
    pub fn set_installment_paid(
        &mut self,
        installment_id: InstallmentId,
        paid: bool,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<Installment>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let mut installment: Installment = self.require(user, installment_id)?;
        installment.paid = paid;
        installment.paid_date = paid.then(|| today(time_provider));
        self.store.update_record(&installment)?;

        self.events.emit(match installment.paid_date {
            Some(paid_date) => Event::InstallmentPaid {
                installment_id,
                paid_date,
            },
            None => Event::InstallmentUnpaid { installment_id },
        });
        Ok(Some(installment))
    }

    /// installments due within `from..=to`, earliest first
    pub fn list_installments(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Installment>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let query = self
            .owned(user)
            .gte("due_date", from)
            .lte("due_date", to)
            .order_by("due_date", true);
        self.store.fetch(&query)
    }

    /// plan of a purchase, in installment order
    pub fn installments_for_purchase(&self, purchase_id: PurchaseId) -> Result<Vec<Installment>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let query = self
            .owned(user)
            .eq("purchase_id", purchase_id)
            .order_by("index", true);
        self.store.fetch(&query)
    }

    #[instrument(skip(self))]
    pub fn delete_installment(&mut self, installment_id: InstallmentId) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let installment: Installment = self.require(user, installment_id)?;
        let deleted = self.store.delete_by_id::<Installment>(installment.id)?;

        self.events.emit(Event::InstallmentDeleted { installment_id });
        Ok(deleted)
    }

    /// stored form of a generated plan
    pub(super) fn plan_records(
        &self,
        owner_id: UserId,
        purchase_id: Option<PurchaseId>,
        card_id: Option<CardId>,
        description: &str,
        category: Option<&str>,
        plan: &InstallmentPlan,
    ) -> Vec<Installment> {
        let label = self.config.installments.label_descriptions;
        plan.installments
            .iter()
            .map(|scheduled| Installment {
                id: Uuid::new_v4(),
                owner_id,
                purchase_id,
                card_id,
                description: if label {
                    format!("{} {}", description, scheduled.label())
                } else {
                    description.to_string()
                },
                amount: scheduled.amount,
                index: scheduled.index,
                total: scheduled.total,
                due_date: scheduled.due_date,
                category: category.map(str::to_string),
                paid: false,
                paid_date: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::Ledger;
    use crate::config::LedgerConfig;
    use crate::decimal::Money;
    use crate::errors::LedgerError;
    use crate::events::Event;
    use crate::models::{NewCard, NewInstallmentPlan};
    use crate::session::StaticSession;
    use crate::store::{MemoryStore, Table};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn plan_in_progress(card_id: Option<uuid::Uuid>) -> NewInstallmentPlan {
        NewInstallmentPlan {
            description: "Notebook".to_string(),
            total_amount: Money::from_major(1_000),
            start_date: date(2024, 6, 5),
            count: 10,
            start_index: 7,
            card_id,
            category: Some("Eletrônicos".to_string()),
        }
    }

    #[test]
    fn test_installment_in_progress_resumes_at_start_index() {
        let (mut ledger, _) = ledger();
        let card = ledger.create_card(NewCard::new("Visa", 10, Some(17))).unwrap().unwrap();

        let created = ledger
            .create_installment_in_progress(plan_in_progress(Some(card.id)))
            .unwrap()
            .unwrap();

        assert_eq!(created.len(), 4);
        let indexes: Vec<u32> = created.iter().map(|i| i.index).collect();
        assert_eq!(indexes, vec![7, 8, 9, 10]);
        assert_eq!(created[0].due_date, date(2024, 6, 17));
        assert_eq!(created[3].due_date, date(2024, 9, 17));
        assert_eq!(created[0].description, "Notebook 7/10");
        assert!(created.iter().all(|i| i.purchase_id.is_none()));
        assert!(created.iter().all(|i| i.amount == Money::from_major(100)));
        assert!(matches!(
            ledger.events.events().last(),
            Some(Event::InstallmentPlanCreated { start_index: 7, .. })
        ));
    }

    #[test]
    fn test_installment_in_progress_rejects_bad_start() {
        let (mut ledger, _) = ledger();
        let mut plan = plan_in_progress(None);
        plan.start_index = 11;
        assert!(matches!(
            ledger.create_installment_in_progress(plan),
            Err(LedgerError::InvalidPlan { .. })
        ));
        assert_eq!(ledger.store().len(Table::Installments), 0);
    }

    #[test]
    fn test_unlabelled_descriptions() {
        let config = LedgerConfig {
            installments: crate::config::InstallmentConfig {
                label_descriptions: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut ledger = Ledger::new(
            MemoryStore::new(),
            StaticSession::signed_in(uuid::Uuid::new_v4()),
            config,
        )
        .unwrap();

        let created = ledger
            .create_installment_in_progress(plan_in_progress(None))
            .unwrap()
            .unwrap();
        assert!(created.iter().all(|i| i.description == "Notebook"));
    }

    #[test]
    fn test_set_installment_paid_uses_today() {
        let (mut ledger, _) = ledger();
        let created = ledger
            .create_installment_in_progress(plan_in_progress(None))
            .unwrap()
            .unwrap();
        let time = time_at(2024, 6, 4);

        let paid = ledger.set_installment_paid(created[0].id, true, &time).unwrap().unwrap();
        assert!(paid.paid);
        assert_eq!(paid.paid_date, Some(date(2024, 6, 4)));

        time.test_control().unwrap().advance(Duration::days(3));
        let unpaid = ledger.set_installment_paid(created[0].id, false, &time).unwrap().unwrap();
        assert!(!unpaid.paid);
        assert_eq!(unpaid.paid_date, None);

        let stored = ledger.list_installments(date(2024, 6, 1), date(2024, 6, 30)).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!stored[0].paid);
    }

    #[test]
    fn test_list_and_delete_installments() {
        let (mut ledger, _) = ledger();
        let created = ledger
            .create_installment_in_progress(NewInstallmentPlan {
                total_amount: Money::from_decimal(dec!(250.00)),
                count: 3,
                start_index: 1,
                ..plan_in_progress(None)
            })
            .unwrap()
            .unwrap();

        let summer = ledger.list_installments(date(2024, 7, 1), date(2024, 8, 31)).unwrap();
        assert_eq!(summer.len(), 2);
        assert_eq!(summer[1].amount, Money::from_decimal(dec!(83.34)));

        assert_eq!(ledger.delete_installment(created[1].id).unwrap(), 1);
        assert_eq!(ledger.store().len(Table::Installments), 2);
        assert!(matches!(
            ledger.delete_installment(created[1].id),
            Err(LedgerError::NotFound { .. })
        ));
    }
}
