//! # Ledger
//!
//! User-facing operations over the store: cards, purchases, installment
//! plans, statements, recurring purchases, categories and budgets. Every
//! operation is scoped to the session's user; without one, reads come back
//! empty and writes do nothing.

pub mod budgets;
pub mod cards;
pub mod categories;
pub mod installments;
pub mod purchases;
pub mod recurring;
pub mod statements;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use uuid::Uuid;

use crate::billing::BillingCycleAllocator;
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::events::EventStore;
use crate::session::SessionProvider;
use crate::store::{Query, Record, Store, StoreExt};
use crate::types::UserId;

pub use budgets::BudgetLine;
pub use categories::CategoryTotal;
pub use statements::Statement;

/// ledger bound to a store and a session
pub struct Ledger<S: Store, P: SessionProvider> {
    store: S,
    session: P,
    config: LedgerConfig,
    allocator: BillingCycleAllocator,
    pub events: EventStore,
}

impl<S: Store, P: SessionProvider> Ledger<S, P> {
    pub fn new(store: S, session: P, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let allocator = BillingCycleAllocator::new(&config);
        Ok(Self {
            store,
            session,
            config,
            allocator,
            events: EventStore::new(),
        })
    }

    /// ledger with the default configuration
    pub fn with_defaults(store: S, session: P) -> Self {
        let config = LedgerConfig::default();
        Self {
            allocator: BillingCycleAllocator::new(&config),
            store,
            session,
            config,
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &P {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut P {
        &mut self.session
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn allocator(&self) -> &BillingCycleAllocator {
        &self.allocator
    }

    /// signed-in user, if any
    pub fn user(&self) -> Option<UserId> {
        self.session.current_user()
    }

    /// query restricted to `user`'s rows
    fn owned(&self, user: UserId) -> Query {
        Query::new().eq("owner_id", user)
    }

    /// fetch a record of `user` or fail with `NotFound`
    fn require<R: Record>(&self, user: UserId, id: Uuid) -> Result<R> {
        let query = self.owned(user).eq("id", id).limit(1);
        self.store
            .fetch::<R>(&query)?
            .into_iter()
            .next()
            .ok_or(LedgerError::NotFound { table: R::TABLE, id })
    }
}

/// current date according to the time provider
pub fn today(time_provider: &SafeTimeProvider) -> NaiveDate {
    time_provider.now().date_naive()
}
