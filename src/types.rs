use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

/// identifier of the signed-in owner of every record
pub type UserId = Uuid;
pub type CardId = Uuid;
pub type PurchaseId = Uuid;
pub type InstallmentId = Uuid;
pub type StatementId = Uuid;
pub type ExpenseTypeId = Uuid;
pub type RecurringId = Uuid;
pub type BudgetId = Uuid;

/// how a purchase was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Pix,
    Cash,
    Debit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Debit => "debit",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" | "credit" | "cartao" => Ok(PaymentMethod::Card),
            "pix" => Ok(PaymentMethod::Pix),
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "debit" | "debito" => Ok(PaymentMethod::Debit),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// budget consumption state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    /// nothing spent yet
    Unused,
    /// below the warning threshold
    OnTrack,
    /// at or above the warning threshold, within the limit
    Warning,
    /// spent more than the limit
    Exceeded,
}

impl BudgetStatus {
    pub fn classify(spent: Money, limit: Money, warning_threshold: Rate) -> Self {
        if spent.is_zero() {
            return BudgetStatus::Unused;
        }
        if spent > limit {
            return BudgetStatus::Exceeded;
        }
        match Rate::ratio(spent, limit) {
            Some(usage) if usage >= warning_threshold => BudgetStatus::Warning,
            Some(_) => BudgetStatus::OnTrack,
            // unreachable: a zero limit with spending is already exceeded
            None => BudgetStatus::Exceeded,
        }
    }
}
