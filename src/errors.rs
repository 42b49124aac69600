use thiserror::Error;
use uuid::Uuid;

use crate::store::Table;
use crate::types::PaymentMethod;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid installment plan: {message}")]
    InvalidPlan {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid amount: {input}")]
    InvalidAmount {
        input: String,
    },

    #[error("invalid day of month: {day}")]
    InvalidDay {
        day: u32,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("card required for credit card purchases")]
    CardRequired,

    #[error("{method} purchases cannot be billed to a card")]
    UnexpectedCard {
        method: PaymentMethod,
    },

    #[error("{table} record not found: {id}")]
    NotFound {
        table: Table,
        id: Uuid,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
