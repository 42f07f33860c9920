//! In-memory store
//!
//! A single async mutex guards all state. A [`LedgerUnit`] holds the guard
//! for its whole lifetime, which serializes ledger work across accounts;
//! acceptable for tests and single-node development runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerUnit, MemberFilter, Store, StoreError};
use crate::aggregate::{AccountKind, Member, NewShare, SavingAccount, Share};
use crate::domain::{NewTransaction, Staff, Transaction, TransactionType};

#[derive(Debug, Default)]
struct State {
    member_seq: i64,
    share_seq: i64,
    account_seq: i64,
    transaction_seq: i64,
    members: BTreeMap<i64, Member>,
    accounts: BTreeMap<i64, SavingAccount>,
    transactions: Vec<Transaction>,
    staff: Vec<Staff>,
}

fn next_id(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl State {
    fn certificate_taken(&self, certificate_number: &str) -> bool {
        self.members
            .values()
            .flat_map(|m| m.shares.iter())
            .any(|s| s.certificate_number == certificate_number)
    }

    /// Check a share batch against existing certificates and itself
    fn check_certificates(&self, shares: &[NewShare]) -> Result<(), StoreError> {
        for (i, share) in shares.iter().enumerate() {
            let repeated = shares[..i]
                .iter()
                .any(|s| s.certificate_number == share.certificate_number);
            if repeated || self.certificate_taken(&share.certificate_number) {
                return Err(StoreError::unique("shares_certificate_number_key"));
            }
        }
        Ok(())
    }

    fn issue(&mut self, member_id: i64, shares: &[NewShare]) -> Vec<Share> {
        shares
            .iter()
            .cloned()
            .map(|share| {
                let id = next_id(&mut self.share_seq);
                share.into_share(id, member_id)
            })
            .collect()
    }

    fn reference_taken(&self, reference: &str) -> bool {
        self.transactions
            .iter()
            .any(|t| t.reference_number == reference)
    }

    fn total(
        &self,
        account_id: i64,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Decimal {
        self.transactions
            .iter()
            .filter(|t| {
                t.account_id == account_id
                    && t.transaction_type == kind
                    && t.transaction_date >= from
                    && t.transaction_date < to
            })
            .map(|t| t.amount.value())
            .sum()
    }
}

/// Store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_member(
        &self,
        member: &Member,
        shares: &[NewShare],
    ) -> Result<Member, StoreError> {
        let mut state = self.state.lock().await;

        if state
            .members
            .values()
            .any(|m| m.employee_id == member.employee_id)
        {
            return Err(StoreError::unique("members_employee_id_key"));
        }
        state.check_certificates(shares)?;

        let mut stored = member.clone();
        stored.id = next_id(&mut state.member_seq);
        stored.shares = state.issue(stored.id, shares);
        state.members.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_member(&self, member_id: i64) -> Result<Option<Member>, StoreError> {
        Ok(self.state.lock().await.members.get(&member_id).cloned())
    }

    async fn find_member_by_employee_id(
        &self,
        employee_id: &str,
    ) -> Result<Option<Member>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .values()
            .find(|m| m.employee_id == employee_id)
            .cloned())
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn count_members(&self, active: Option<bool>) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .members
            .values()
            .filter(|m| active.map_or(true, |a| m.is_active == a))
            .count();
        Ok(count as i64)
    }

    async fn update_member(&self, member: &Member) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let stored = state
            .members
            .get_mut(&member.id)
            .ok_or_else(|| StoreError::NotFound(format!("member {}", member.id)))?;

        let shares = std::mem::take(&mut stored.shares);
        *stored = Member {
            shares,
            ..member.clone()
        };
        Ok(())
    }

    async fn append_shares(
        &self,
        member_id: i64,
        shares: &[NewShare],
    ) -> Result<Vec<Share>, StoreError> {
        let mut state = self.state.lock().await;
        if !state.members.contains_key(&member_id) {
            return Err(StoreError::NotFound(format!("member {member_id}")));
        }
        state.check_certificates(shares)?;

        let issued = state.issue(member_id, shares);
        if let Some(member) = state.members.get_mut(&member_id) {
            member.shares.extend(issued.iter().cloned());
        }
        Ok(issued)
    }

    async fn account_number_exists(&self, account_number: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .any(|a| a.account_number == account_number))
    }

    async fn insert_account(&self, account: &SavingAccount) -> Result<SavingAccount, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .accounts
            .values()
            .any(|a| a.account_number == account.account_number)
        {
            return Err(StoreError::unique("saving_accounts_account_number_key"));
        }
        if !state.members.contains_key(&account.member_id) {
            return Err(StoreError::NotFound(format!("member {}", account.member_id)));
        }

        let mut stored = account.clone();
        stored.id = next_id(&mut state.account_seq);
        state.accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_account(&self, account_id: i64) -> Result<Option<SavingAccount>, StoreError> {
        Ok(self.state.lock().await.accounts.get(&account_id).cloned())
    }

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<SavingAccount>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.account_number == account_number)
            .cloned())
    }

    async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<SavingAccount>, StoreError> {
        let state = self.state.lock().await;
        let needle = search.map(|s| s.trim().to_lowercase());
        Ok(state
            .accounts
            .values()
            .filter(|a| {
                let Some(needle) = needle.as_deref() else {
                    return true;
                };
                a.account_number.to_lowercase().contains(needle)
                    || state
                        .members
                        .get(&a.member_id)
                        .map_or(false, |m| m.full_name().to_lowercase().contains(needle))
            })
            .cloned()
            .collect())
    }

    async fn member_accounts(
        &self,
        member_id: i64,
        active_only: bool,
    ) -> Result<Vec<SavingAccount>, StoreError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<SavingAccount> = state
            .accounts
            .values()
            .filter(|a| a.member_id == member_id && (!active_only || a.is_active))
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.opening_date, a.id));
        Ok(accounts)
    }

    async fn count_accounts(
        &self,
        member_id: i64,
        kind: AccountKind,
        active_only: bool,
    ) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .accounts
            .values()
            .filter(|a| {
                a.member_id == member_id && a.kind() == kind && (!active_only || a.is_active)
            })
            .count();
        Ok(count as i64)
    }

    async fn begin_ledger(
        &self,
        account_id: i64,
    ) -> Result<Option<Box<dyn LedgerUnit>>, StoreError> {
        let state = self.state.clone().lock_owned().await;
        let Some(account) = state.accounts.get(&account_id).cloned() else {
            return Ok(None);
        };
        let unit: Box<dyn LedgerUnit> = Box::new(MemoryLedgerUnit { state, account });
        Ok(Some(unit))
    }

    async fn account_transactions(&self, account_id: i64) -> Result<Vec<Transaction>, StoreError> {
        let state = self.state.lock().await;
        let mut transactions: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(transactions)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .transactions
            .iter()
            .find(|t| t.reference_number == reference)
            .cloned())
    }

    async fn transaction_total(
        &self,
        account_id: i64,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        Ok(self.state.lock().await.total(account_id, kind, from, to))
    }

    async fn find_staff_by_key_hash(&self, key_hash: &str) -> Result<Option<Staff>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.staff.iter().find(|s| s.key_hash == key_hash).cloned())
    }

    async fn upsert_staff(&self, staff: &Staff) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.staff.retain(|s| s.username != staff.username);
        if state.staff.iter().any(|s| s.key_hash == staff.key_hash) {
            return Err(StoreError::unique("staff_api_keys_key_hash_key"));
        }
        state.staff.push(staff.clone());
        Ok(())
    }
}

struct MemoryLedgerUnit {
    state: OwnedMutexGuard<State>,
    account: SavingAccount,
}

impl MemoryLedgerUnit {
    fn write_account(state: &mut State, account: &SavingAccount) -> Result<(), StoreError> {
        match state.accounts.get_mut(&account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("account {}", account.id))),
        }
    }
}

#[async_trait]
impl LedgerUnit for MemoryLedgerUnit {
    fn account(&self) -> &SavingAccount {
        &self.account
    }

    async fn transaction_total(
        &mut self,
        kind: TransactionType,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        Ok(self.state.total(self.account.id, kind, from, to))
    }

    async fn reference_exists(&mut self, reference: &str) -> Result<bool, StoreError> {
        Ok(self.state.reference_taken(reference))
    }

    async fn post(
        self: Box<Self>,
        account: &SavingAccount,
        entry: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut unit = *self;
        let state = &mut *unit.state;

        if state.reference_taken(&entry.reference_number) {
            return Err(StoreError::unique("transactions_reference_number_key"));
        }
        Self::write_account(state, account)?;

        let id = next_id(&mut state.transaction_seq);
        let transaction = entry.into_transaction(id);
        state.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn save(self: Box<Self>, account: &SavingAccount) -> Result<(), StoreError> {
        let mut unit = *self;
        Self::write_account(&mut unit.state, account)
    }
}
