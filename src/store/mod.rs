//! Store module
//!
//! Persistence seam for members, accounts, transactions and staff keys.
//! [`PgStore`] backs the running service; [`InMemoryStore`] backs tests and
//! local runs without a database.
//!
//! Every balance change goes through a [`LedgerUnit`]: a unit of work that
//! holds an exclusive lock on one account from the moment it is loaded
//! until it is posted, saved, or dropped (dropping rolls back).

mod error;
mod memory;
mod postgres;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::aggregate::{AccountKind, Member, NewShare, SavingAccount, Share, WorkDomain};
use crate::domain::{NewTransaction, Staff, Transaction, TransactionType};

pub type SharedStore = Arc<dyn Store>;

/// Member listing filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberFilter {
    pub active: Option<bool>,
    pub work_domain: Option<WorkDomain>,
    /// Case-insensitive substring of first name, last name or employee id
    pub keyword: Option<String>,
}

impl MemberFilter {
    pub fn active() -> Self {
        Self {
            active: Some(true),
            ..Default::default()
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        self.active.map_or(true, |active| member.is_active == active)
            && self.work_domain.map_or(true, |domain| member.work_domain == domain)
            && self
                .keyword
                .as_deref()
                .map_or(true, |keyword| member.matches_keyword(keyword))
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // -------------------------------------------------------------------------
    // Members
    // -------------------------------------------------------------------------

    /// Insert a member and its initial shares in one unit of work.
    /// Fails with `UniqueViolation` on a taken employee id.
    async fn insert_member(
        &self,
        member: &Member,
        shares: &[NewShare],
    ) -> Result<Member, StoreError>;

    async fn get_member(&self, member_id: i64) -> Result<Option<Member>, StoreError>;

    async fn find_member_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Member>, StoreError>;

    /// Members matching `filter`, ordered by id
    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError>;

    async fn count_members(&self, active: Option<bool>) -> Result<i64, StoreError>;

    /// Persist profile and status fields. Shares are not touched.
    async fn update_member(&self, member: &Member) -> Result<(), StoreError>;

    /// Append shares atomically; a taken certificate number rejects the batch
    async fn append_shares(
        &self,
        member_id: i64,
        shares: &[NewShare],
    ) -> Result<Vec<Share>, StoreError>;

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------

    async fn account_number_exists(&self, account_number: &str) -> Result<bool, StoreError>;

    async fn insert_account(&self, account: &SavingAccount) -> Result<SavingAccount, StoreError>;

    async fn get_account(&self, account_id: i64) -> Result<Option<SavingAccount>, StoreError>;

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<SavingAccount>, StoreError>;

    /// Every account ordered by id. `search` matches the account number or
    /// the holder's full name, case-insensitively.
    async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<SavingAccount>, StoreError>;

    /// A member's accounts ordered by (opening date, id)
    async fn member_accounts(
        &self,
        member_id: i64,
        active_only: bool,
    ) -> Result<Vec<SavingAccount>, StoreError>;

    async fn count_accounts(
        &self,
        member_id: i64,
        kind: AccountKind,
        active_only: bool,
    ) -> Result<i64, StoreError>;

    // -------------------------------------------------------------------------
    // Ledger
    // -------------------------------------------------------------------------

    /// Lock an account for a read-check-write sequence.
    /// `None` when the account does not exist.
    async fn begin_ledger(
        &self,
        account_id: i64,
    ) -> Result<Option<Box<dyn LedgerUnit>>, StoreError>;

    /// Newest first
    async fn account_transactions(&self, account_id: i64) -> Result<Vec<Transaction>, StoreError>;

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Sum of `kind` amounts for an account in `[from, to)`
    async fn transaction_total(
        &self,
        account_id: i64,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError>;

    // -------------------------------------------------------------------------
    // Staff
    // -------------------------------------------------------------------------

    async fn find_staff_by_key_hash(&self, key_hash: &str) -> Result<Option<Staff>, StoreError>;

    /// Insert or replace the staff record with the same username
    async fn upsert_staff(&self, staff: &Staff) -> Result<(), StoreError>;
}

/// A locked unit of work over one account.
#[async_trait]
pub trait LedgerUnit: Send {
    /// The account as read under the lock
    fn account(&self) -> &SavingAccount;

    /// Same as [`Store::transaction_total`], read inside the lock
    async fn transaction_total(
        &mut self,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError>;

    async fn reference_exists(&mut self, reference: &str) -> Result<bool, StoreError>;

    /// Write the updated account and append the entry, then commit
    async fn post(
        self: Box<Self>,
        account: &SavingAccount,
        entry: NewTransaction,
    ) -> Result<Transaction, StoreError>;

    /// Write the updated account without a ledger entry, then commit
    async fn save(self: Box<Self>, account: &SavingAccount) -> Result<(), StoreError>;
}
