//! Aggregate module
//!
//! The two aggregate roots: a member with their shares, and a savings
//! account with its variant terms. Transactions reference accounts by id.

pub mod account;
pub mod member;

pub use account::{AccountKind, AccountTerms, SavingAccount};
pub use member::{Member, MemberChanges, NewMember, NewShare, Share, WorkDomain};
