//! Command Handlers module
//!
//! The four business components, leaves first: members, accounts, the
//! ledger, and the bulk deposit coordinator built on the other three.

mod account_registry;
mod bulk_deposit;
mod commands;
mod ledger_engine;
mod member_registry;

#[cfg(test)]
mod tests;

pub use account_registry::AccountRegistry;
pub use bulk_deposit::{BulkDepositCoordinator, DEFAULT_BULK_DESCRIPTION};
pub use commands::*;
pub use ledger_engine::{
    LedgerEngine, DEFAULT_DEPOSIT_DESCRIPTION, DEFAULT_MONTHLY_DESCRIPTION,
    DEFAULT_WITHDRAWAL_DESCRIPTION,
};
pub use member_registry::MemberRegistry;

use std::sync::Arc;

use crate::domain::{NumberGenerator, SharedClock};
use crate::store::SharedStore;

/// All components wired over one store, clock and number generator.
/// Cheap to clone; used as the router state.
#[derive(Clone)]
pub struct Services {
    pub store: SharedStore,
    pub members: MemberRegistry,
    pub accounts: AccountRegistry,
    pub ledger: LedgerEngine,
    pub bulk: BulkDepositCoordinator,
}

impl Services {
    pub fn new(store: SharedStore, clock: SharedClock, numbers: Arc<NumberGenerator>) -> Self {
        let members = MemberRegistry::new(store.clone(), clock.clone());
        let accounts = AccountRegistry::new(
            store.clone(),
            clock.clone(),
            numbers.clone(),
            members.clone(),
        );
        let ledger = LedgerEngine::new(store.clone(), clock, numbers);
        let bulk = BulkDepositCoordinator::new(members.clone(), accounts.clone(), ledger.clone());

        Self {
            store,
            members,
            accounts,
            ledger,
            bulk,
        }
    }
}
