//! Account Registry
//!
//! Opening savings accounts and toggling their lifecycle.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::aggregate::account::MAX_INFORMAL_ACCOUNTS;
use crate::aggregate::{AccountKind, AccountTerms, SavingAccount};
use crate::domain::{DomainError, NumberGenerator, SharedClock};
use crate::error::AppError;
use crate::store::SharedStore;

use super::MemberRegistry;

/// Attempts at drawing an unused account number before giving up
const MAX_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct AccountRegistry {
    store: SharedStore,
    clock: SharedClock,
    numbers: Arc<NumberGenerator>,
    members: MemberRegistry,
}

impl AccountRegistry {
    pub fn new(
        store: SharedStore,
        clock: SharedClock,
        numbers: Arc<NumberGenerator>,
        members: MemberRegistry,
    ) -> Self {
        Self {
            store,
            clock,
            numbers,
            members,
        }
    }

    // =========================================================================
    // open_formal
    // =========================================================================

    /// Open the member's one formal account
    pub async fn open_formal(
        &self,
        member_id: i64,
        monthly_amount: Decimal,
    ) -> Result<SavingAccount, AppError> {
        let terms = AccountTerms::formal(monthly_amount)?;
        self.members.require_eligible(member_id).await?;

        // closed formal accounts still count
        let existing = self
            .store
            .count_accounts(member_id, AccountKind::Formal, false)
            .await?;
        if existing > 0 {
            return Err(DomainError::AlreadyExists(format!(
                "Member {member_id} already has a formal account"
            ))
            .into());
        }

        self.open(member_id, terms).await
    }

    // =========================================================================
    // open_informal
    // =========================================================================

    /// Open an informal account; at most two active ones per member
    pub async fn open_informal(
        &self,
        member_id: i64,
        target_amount: Option<Decimal>,
    ) -> Result<SavingAccount, AppError> {
        let terms = AccountTerms::informal(target_amount)?;
        self.members.require_eligible(member_id).await?;

        let active = self
            .store
            .count_accounts(member_id, AccountKind::Informal, true)
            .await?;
        if active >= MAX_INFORMAL_ACCOUNTS {
            return Err(DomainError::limit_exceeded(format!(
                "Maximum {MAX_INFORMAL_ACCOUNTS} informal accounts allowed per member"
            ))
            .into());
        }

        self.open(member_id, terms).await
    }

    async fn open(&self, member_id: i64, terms: AccountTerms) -> Result<SavingAccount, AppError> {
        let kind = terms.kind();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let number = self.unused_account_number(kind).await?;
            let account = SavingAccount::open(member_id, number, terms.clone(), self.clock.today());

            match self.store.insert_account(&account).await {
                Ok(account) => {
                    tracing::info!(
                        member_id,
                        account_id = account.id,
                        account_number = %account.account_number,
                        account_type = %kind,
                        "Savings account opened"
                    );
                    return Ok(account);
                }
                // lost a race for the number between the check and the insert
                Err(e) if e.is_unique_violation() && attempts < MAX_NUMBER_ATTEMPTS => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn unused_account_number(&self, kind: AccountKind) -> Result<String, AppError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = self.numbers.account_number(kind);
            if !self.store.account_number_exists(&number).await? {
                return Ok(number);
            }
            tracing::debug!(account_number = %number, "Account number collision, retrying");
        }
        Err(AppError::Internal(
            "Could not allocate a unique account number".to_string(),
        ))
    }

    pub async fn get(&self, account_id: i64) -> Result<SavingAccount, AppError> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id).into())
    }

    pub async fn get_by_number(&self, account_number: &str) -> Result<SavingAccount, AppError> {
        self.store
            .find_account_by_number(account_number)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_number).into())
    }

    /// All accounts, optionally narrowed by account number or holder name
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<SavingAccount>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.list_accounts(search).await?)
    }

    pub async fn member_accounts(&self, member_id: i64) -> Result<Vec<SavingAccount>, AppError> {
        self.members.get(member_id).await?;
        Ok(self.store.member_accounts(member_id, false).await?)
    }

    /// Active accounts, oldest first by (opening date, id)
    pub async fn active_member_accounts(
        &self,
        member_id: i64,
    ) -> Result<Vec<SavingAccount>, AppError> {
        self.members.get(member_id).await?;
        Ok(self.store.member_accounts(member_id, true).await?)
    }

    /// Sum of the member's active account balances
    pub async fn member_total_balance(&self, member_id: i64) -> Result<Decimal, AppError> {
        let accounts = self.active_member_accounts(member_id).await?;
        Ok(accounts.iter().map(SavingAccount::balance).sum())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close an empty account, under the account lock
    pub async fn close(&self, account_id: i64) -> Result<SavingAccount, AppError> {
        let account = self
            .update_locked(account_id, |account| account.close())
            .await?;

        tracing::info!(account_id, account_number = %account.account_number, "Account closed");
        Ok(account)
    }

    pub async fn deactivate(&self, account_id: i64) -> Result<SavingAccount, AppError> {
        let account = self
            .update_locked(account_id, |account| {
                account.is_active = false;
                Ok(())
            })
            .await?;

        tracing::info!(account_id, "Account deactivated");
        Ok(account)
    }

    pub async fn reactivate(&self, account_id: i64) -> Result<SavingAccount, AppError> {
        let account = self
            .update_locked(account_id, |account| {
                account.is_active = true;
                Ok(())
            })
            .await?;

        tracing::info!(account_id, "Account reactivated");
        Ok(account)
    }

    async fn update_locked(
        &self,
        account_id: i64,
        change: impl FnOnce(&mut SavingAccount) -> Result<(), DomainError>,
    ) -> Result<SavingAccount, AppError> {
        let unit = self
            .store
            .begin_ledger(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id))?;

        let mut account = unit.account().clone();
        change(&mut account)?;
        unit.save(&account).await?;
        Ok(account)
    }
}
