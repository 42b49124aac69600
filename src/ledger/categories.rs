use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;
use uuid::Uuid;

use super::Ledger;
use crate::billing::BillingPeriod;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::models::{find_expense_type, ExpenseType, Installment, Purchase};
use crate::session::SessionProvider;
use crate::store::{Store, StoreExt};
use crate::types::ExpenseTypeId;

/// spending of one category over a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// None for uncategorized spending
    pub category: Option<String>,
    pub total: Money,
}

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// Create a category, or update the color of the one with the same name.
    #[instrument(skip(self))]
    pub fn create_expense_type(&mut self, name: &str, color: Option<&str>) -> Result<Option<ExpenseType>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "category name required".to_string(),
            });
        }

        let expense_type = ExpenseType {
            id: Uuid::new_v4(),
            owner_id: user,
            name: name.to_string(),
            color: color.map(str::to_string),
        };
        let saved = self
            .store
            .upsert_record(&expense_type, &["owner_id", "name"])?;

        self.events.emit(Event::ExpenseTypeSaved {
            expense_type_id: saved.id,
            name: saved.name.clone(),
        });
        Ok(Some(saved))
    }

    pub fn list_expense_types(&self) -> Result<Vec<ExpenseType>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        self.store.fetch(&self.owned(user).order_by("name", true))
    }

    /// category with exactly `name`, if the user has one
    pub fn expense_type_by_name(&self, name: &str) -> Result<Option<ExpenseType>> {
        let types = self.list_expense_types()?;
        Ok(find_expense_type(&types, name).cloned())
    }

    /// Delete a category. Purchases keep the name they were recorded with.
    #[instrument(skip(self))]
    pub fn delete_expense_type(&mut self, expense_type_id: ExpenseTypeId) -> Result<usize> {
        let Some(user) = self.user() else {
            return Ok(0);
        };
        let expense_type: ExpenseType = self.require(user, expense_type_id)?;
        let deleted = self.store.delete_by_id::<ExpenseType>(expense_type.id)?;

        self.events.emit(Event::ExpenseTypeDeleted { expense_type_id });
        Ok(deleted)
    }

    /// Spending per category in the month of `period`: single purchases dated
    /// in the month plus installments due in it. Largest first.
    pub fn spending_by_category(&self, period: BillingPeriod) -> Result<Vec<CategoryTotal>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let (first, last) = (period.first_day()?, period.last_day()?);

        let purchases: Vec<Purchase> = self.store.fetch(
            &self
                .owned(user)
                .eq("is_installment", false)
                .gte("date", first)
                .lte("date", last),
        )?;
        let installments: Vec<Installment> = self
            .store
            .fetch(&self.owned(user).gte("due_date", first).lte("due_date", last))?;

        let mut totals: BTreeMap<Option<String>, Money> = BTreeMap::new();
        let spending = purchases
            .into_iter()
            .map(|p| (p.category, p.amount))
            .chain(installments.into_iter().map(|i| (i.category, i.amount)));
        for (category, amount) in spending {
            *totals.entry(category).or_insert(Money::ZERO) += amount;
        }

        let mut totals: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, total)| CategoryTotal { category, total })
            .collect();
        totals.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(totals)
    }
}
