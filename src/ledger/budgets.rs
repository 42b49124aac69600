use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::Ledger;
use crate::billing::BillingPeriod;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::models::Budget;
use crate::session::SessionProvider;
use crate::store::{Store, StoreExt};
use crate::types::BudgetStatus;

/// budget of one category against what was spent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub budget: Budget,
    pub spent: Money,
    /// negative once the limit is exceeded
    pub remaining: Money,
    pub usage: Option<Rate>,
    pub status: BudgetStatus,
}

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    /// Set the monthly limit of a category, replacing any earlier one.
    #[instrument(skip(self))]
    pub fn set_budget(&mut self, category: &str, period: BillingPeriod, limit: Money) -> Result<Option<Budget>> {
        let Some(user) = self.user() else {
            return Ok(None);
        };
        if !limit.is_positive() {
            return Err(LedgerError::InvalidAmount {
                input: limit.to_string(),
            });
        }

        let budget = Budget {
            id: Uuid::new_v4(),
            owner_id: user,
            category: category.trim().to_string(),
            period,
            limit,
        };
        let budget = self
            .store
            .upsert_record(&budget, &["owner_id", "category", "year", "month"])?;

        self.events.emit(Event::BudgetSet {
            budget_id: budget.id,
            category: budget.category.clone(),
            period,
            limit,
        });
        Ok(Some(budget))
    }

    pub fn list_budgets(&self, period: BillingPeriod) -> Result<Vec<Budget>> {
        let Some(user) = self.user() else {
            return Ok(Vec::new());
        };
        let query = self
            .owned(user)
            .eq("year", period.year())
            .eq("month", period.month())
            .order_by("category", true);
        self.store.fetch(&query)
    }

    /// Usage of every budget set for `period`.
    pub fn budget_report(&self, period: BillingPeriod) -> Result<Vec<BudgetLine>> {
        let budgets = self.list_budgets(period)?;
        if budgets.is_empty() {
            return Ok(Vec::new());
        }
        let spending = self.spending_by_category(period)?;
        let threshold = self.config.budgets.warning_threshold;

        let lines: Vec<BudgetLine> = budgets
            .into_iter()
            .map(|budget| {
                let spent = spending
                    .iter()
                    .find(|t| t.category.as_deref() == Some(budget.category.as_str()))
                    .map_or(Money::ZERO, |t| t.total);
                let status = BudgetStatus::classify(spent, budget.limit, threshold);
                if status == BudgetStatus::Exceeded {
                    warn!(category = %budget.category, %spent, limit = %budget.limit, "budget exceeded");
                }
                BudgetLine {
                    remaining: budget.limit - spent,
                    usage: Rate::ratio(spent, budget.limit),
                    spent,
                    status,
                    budget,
                }
            })
            .collect();

        info!(%period, budgets = lines.len(), "budget report built");
        Ok(lines)
    }
}
