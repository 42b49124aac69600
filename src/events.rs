use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::billing::BillingPeriod;
use crate::decimal::Money;
use crate::types::{BudgetId, CardId, ExpenseTypeId, InstallmentId, PurchaseId, RecurringId};

/// everything the ledger did on behalf of the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // card events
    CardCreated {
        card_id: CardId,
        name: String,
    },
    CardUpdated {
        card_id: CardId,
    },
    CardDeleted {
        card_id: CardId,
        statements_removed: usize,
    },

    // purchase events
    PurchaseRecorded {
        purchase_id: PurchaseId,
        amount: Money,
        date: NaiveDate,
        period: Option<BillingPeriod>,
    },
    PurchaseUpdated {
        purchase_id: PurchaseId,
        period: Option<BillingPeriod>,
    },
    PurchaseDeleted {
        purchase_id: PurchaseId,
        installments_removed: usize,
    },

    // installment events
    InstallmentPlanReplaced {
        purchase_id: PurchaseId,
        removed: usize,
        inserted: usize,
        total: Money,
    },
    InstallmentPlanCreated {
        description: String,
        count: u32,
        start_index: u32,
        total: Money,
    },
    InstallmentPaid {
        installment_id: InstallmentId,
        paid_date: NaiveDate,
    },
    InstallmentUnpaid {
        installment_id: InstallmentId,
    },
    InstallmentDeleted {
        installment_id: InstallmentId,
    },

    // statement events
    StatementPaid {
        card_id: CardId,
        period: BillingPeriod,
        total: Money,
        payment_date: NaiveDate,
    },
    StatementReopened {
        card_id: CardId,
        period: BillingPeriod,
    },

    // recurring events
    RecurringCreated {
        recurring_id: RecurringId,
        description: String,
    },
    RecurringUpdated {
        recurring_id: RecurringId,
    },
    RecurringDeleted {
        recurring_id: RecurringId,
    },
    RecurringMaterialized {
        recurring_id: RecurringId,
        purchase_id: PurchaseId,
        period: BillingPeriod,
    },

    // category and budget events
    ExpenseTypeSaved {
        expense_type_id: ExpenseTypeId,
        name: String,
    },
    ExpenseTypeDeleted {
        expense_type_id: ExpenseTypeId,
    },
    BudgetSet {
        budget_id: BudgetId,
        category: String,
        period: BillingPeriod,
        limit: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_take_events_drains() {
        let mut store = EventStore::new();
        let card_id = Uuid::new_v4();
        store.emit(Event::CardCreated { card_id, name: "Visa".to_string() });
        store.emit(Event::CardUpdated { card_id });
        assert_eq!(store.events().len(), 2);

        let taken = store.take_events();
        assert_eq!(taken.len(), 2);
        assert!(store.events().is_empty());
        assert!(matches!(taken[0], Event::CardCreated { .. }));
    }
}
