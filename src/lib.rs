pub mod billing;
pub mod calendar;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod models;
pub mod session;
pub mod store;
pub mod types;

// re-export key types
pub use billing::{
    assign_period, generate_installments, period_closing_date, period_due_date, BillingCycleAllocator,
    BillingPeriod, DueSchedule, InstallmentPlan, ScheduledInstallment,
};
pub use config::LedgerConfig;
pub use decimal::{parse_amount, Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::{BudgetLine, CategoryTotal, Ledger, Statement};
pub use models::{
    Budget, Card, ExpenseType, Installment, NewCard, NewInstallmentPlan, NewPurchase, NewRecurring,
    PaidStatement, Purchase, RecurringPurchase,
};
pub use session::{SessionProvider, StaticSession};
pub use store::{MemoryStore, Query, Store, StoreExt, Table};
pub use types::{BudgetStatus, CardId, PaymentMethod, PurchaseId, UserId};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
