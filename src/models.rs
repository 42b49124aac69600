use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::billing::BillingPeriod;
use crate::calendar::validate_day;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::store::{Record, Table};
use crate::types::{
    BudgetId, CardId, ExpenseTypeId, InstallmentId, PaymentMethod, PurchaseId, RecurringId,
    StatementId, UserId,
};

/// credit card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub owner_id: UserId,
    pub name: String,
    pub brand: Option<String>,
    pub credit_limit: Money,
    /// day of month the statement closes (1-31)
    pub closing_day: u32,
    /// day of month the statement is due, in the month after closing
    pub due_day: Option<u32>,
    pub color: Option<String>,
}

impl Card {
    pub fn new(owner_id: UserId, name: &str, closing_day: u32, due_day: Option<u32>) -> Result<Self> {
        validate_day(closing_day)?;
        if let Some(day) = due_day {
            validate_day(day)?;
        }

        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            brand: None,
            credit_limit: Money::ZERO,
            closing_day,
            due_day,
            color: None,
        })
    }
}

/// single expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub owner_id: UserId,
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub payment_method: PaymentMethod,
    pub card_id: Option<CardId>,
    /// split into installments; its plan lives in the installments table
    pub is_installment: bool,
    pub installment_count: Option<u32>,
}

/// one due slice of an installment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub owner_id: UserId,
    /// None for standalone plans already in progress
    pub purchase_id: Option<PurchaseId>,
    pub card_id: Option<CardId>,
    pub description: String,
    pub amount: Money,
    pub index: u32,
    pub total: u32,
    pub due_date: NaiveDate,
    pub category: Option<String>,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
}

/// billing period settled by hand ("fatura paga")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaidStatement {
    pub id: StatementId,
    pub owner_id: UserId,
    pub card_id: CardId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub payment_date: NaiveDate,
    pub total_paid: Money,
}

impl PaidStatement {
    pub fn new(
        owner_id: UserId,
        card_id: CardId,
        period: BillingPeriod,
        payment_date: NaiveDate,
        total_paid: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            card_id,
            period,
            payment_date,
            total_paid,
        }
    }
}

/// user-defined spending category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseType {
    pub id: ExpenseTypeId,
    pub owner_id: UserId,
    pub name: String,
    pub color: Option<String>,
}

/// Category referenced by `name`. Purchases refer to categories by name,
/// so a purchase whose category was renamed or deleted simply has none.
pub fn find_expense_type<'a>(types: &'a [ExpenseType], name: &str) -> Option<&'a ExpenseType> {
    types.iter().find(|t| t.name == name)
}

/// template materialized into one purchase per month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPurchase {
    pub id: RecurringId,
    pub owner_id: UserId,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    pub payment_method: PaymentMethod,
    pub card_id: Option<CardId>,
    pub day_of_month: u32,
    pub active: bool,
}

/// ledger row recording that a template produced its purchase for a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringMaterialization {
    pub id: Uuid,
    pub owner_id: UserId,
    pub recurring_id: RecurringId,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub purchase_id: PurchaseId,
}

/// monthly spending limit for a category ("orçamento")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub owner_id: UserId,
    pub category: String,
    #[serde(flatten)]
    pub period: BillingPeriod,
    pub limit: Money,
}

impl Record for Card {
    const TABLE: Table = Table::Cards;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Purchase {
    const TABLE: Table = Table::Purchases;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Installment {
    const TABLE: Table = Table::Installments;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for PaidStatement {
    const TABLE: Table = Table::PaidStatements;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for ExpenseType {
    const TABLE: Table = Table::ExpenseTypes;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for RecurringPurchase {
    const TABLE: Table = Table::RecurringPurchases;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for RecurringMaterialization {
    const TABLE: Table = Table::RecurringMaterializations;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Budget {
    const TABLE: Table = Table::Budgets;
    fn id(&self) -> Uuid {
        self.id
    }
}

/// card form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub name: String,
    pub brand: Option<String>,
    pub credit_limit: Money,
    pub closing_day: u32,
    pub due_day: Option<u32>,
    pub color: Option<String>,
}

impl NewCard {
    pub fn new(name: &str, closing_day: u32, due_day: Option<u32>) -> Self {
        Self {
            name: name.to_string(),
            brand: None,
            credit_limit: Money::ZERO,
            closing_day,
            due_day,
            color: None,
        }
    }

    pub fn brand(mut self, brand: &str) -> Self {
        self.brand = Some(brand.to_string());
        self
    }

    pub fn credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = limit;
        self
    }

    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::InvalidConfiguration {
                message: "card name required".to_string(),
            });
        }
        validate_day(self.closing_day)?;
        if let Some(day) = self.due_day {
            validate_day(day)?;
        }
        if self.credit_limit.is_negative() {
            return Err(LedgerError::InvalidAmount {
                input: self.credit_limit.to_string(),
            });
        }
        Ok(())
    }
}

/// a card is given exactly when paying by card
fn check_card(payment_method: PaymentMethod, card_id: Option<CardId>) -> Result<()> {
    match (payment_method, card_id) {
        (PaymentMethod::Card, None) => Err(LedgerError::CardRequired),
        (PaymentMethod::Card, Some(_)) | (_, None) => Ok(()),
        (method, Some(_)) => Err(LedgerError::UnexpectedCard { method }),
    }
}

/// purchase form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub description: String,
    pub amount: Money,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub payment_method: PaymentMethod,
    pub card_id: Option<CardId>,
    /// number of installments when bought in installments
    pub installments: Option<u32>,
}

impl NewPurchase {
    pub fn new(description: &str, amount: Money, date: NaiveDate, payment_method: PaymentMethod) -> Self {
        Self {
            description: description.to_string(),
            amount,
            date,
            category: None,
            payment_method,
            card_id: None,
            installments: None,
        }
    }

    pub fn on_card(mut self, card_id: CardId) -> Self {
        self.payment_method = PaymentMethod::Card;
        self.card_id = Some(card_id);
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn in_installments(mut self, count: u32) -> Self {
        self.installments = Some(count);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                input: self.amount.to_string(),
            });
        }
        check_card(self.payment_method, self.card_id)?;
        if let Some(0) = self.installments {
            return Err(LedgerError::InvalidPlan {
                message: "installment count must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// standalone plan already in progress ("parcelamento em andamento")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInstallmentPlan {
    pub description: String,
    pub total_amount: Money,
    /// due date of installment `start_index`
    pub start_date: NaiveDate,
    pub count: u32,
    pub start_index: u32,
    pub card_id: Option<CardId>,
    pub category: Option<String>,
}

/// recurring purchase form input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecurring {
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    pub payment_method: PaymentMethod,
    pub card_id: Option<CardId>,
    pub day_of_month: u32,
}

impl NewRecurring {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                input: self.amount.to_string(),
            });
        }
        check_card(self.payment_method, self.card_id)?;
        validate_day(self.day_of_month)?;
        Ok(())
    }
}
