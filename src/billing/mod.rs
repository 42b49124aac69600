pub mod allocator;
pub mod installments;
pub mod period;

pub use allocator::{assign_period, generate_installments, latest_early_closure, BillingCycleAllocator};
pub use installments::{split_amount, DueSchedule, InstallmentPlan, ScheduledInstallment, DEFAULT_DUE_DAY};
pub use period::{period_closing_date, period_due_date, BillingPeriod};
