//! Domain module
//!
//! Value objects, errors and collaborators shared by the aggregates and
//! the handlers.

pub mod access;
pub mod clock;
pub mod context;
pub mod error;
pub mod money;
pub mod numbering;
pub mod transaction;

pub use access::{Operation, Role, Staff};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use context::OperationContext;
pub use error::DomainError;
pub use money::{Amount, AmountError, Balance};
pub use numbering::NumberGenerator;
pub use transaction::{NewTransaction, Transaction, TransactionType};
