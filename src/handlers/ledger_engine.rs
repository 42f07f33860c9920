//! Ledger Engine
//!
//! Deposits and withdrawals. Each one runs in a single ledger unit that
//! holds the account lock from the first read to the commit, so the
//! monthly-deposit check and the daily withdrawal total are always fresh.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::aggregate::account::{validate_deposit_amount, validate_withdrawal_amount};
use crate::aggregate::SavingAccount;
use crate::domain::clock::{day_bounds, month_bounds};
use crate::domain::transaction::MAX_DESCRIPTION_LEN;
use crate::domain::{
    Amount, DomainError, NewTransaction, NumberGenerator, SharedClock, Transaction,
    TransactionType,
};
use crate::error::AppError;
use crate::store::{LedgerUnit, SharedStore};

use super::LedgerReceipt;

pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Deposit";
pub const DEFAULT_WITHDRAWAL_DESCRIPTION: &str = "Withdrawal";
pub const DEFAULT_MONTHLY_DESCRIPTION: &str = "Monthly deposit";

/// Reference numbers drawn per posting before giving up
const MAX_REFERENCE_ATTEMPTS: u32 = 5;

/// Caller description, or `default` when blank
fn resolve_description(description: Option<&str>, default: &str) -> Result<String, DomainError> {
    let text = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(default);
    if text.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::invalid_argument(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(text.to_string())
}

#[derive(Clone)]
pub struct LedgerEngine {
    store: SharedStore,
    clock: SharedClock,
    numbers: Arc<NumberGenerator>,
}

impl LedgerEngine {
    pub fn new(store: SharedStore, clock: SharedClock, numbers: Arc<NumberGenerator>) -> Self {
        Self {
            store,
            clock,
            numbers,
        }
    }

    // =========================================================================
    // deposit
    // =========================================================================

    pub async fn deposit(
        &self,
        account_id: i64,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<LedgerReceipt, AppError> {
        let amount = validate_deposit_amount(amount)?;
        let description = resolve_description(description, DEFAULT_DEPOSIT_DESCRIPTION)?;

        let unit = self.lock(account_id).await?;
        let mut account = unit.account().clone();
        account.credit(&amount, self.clock.today())?;

        self.post(unit, account, amount, TransactionType::Deposit, description)
            .await
    }

    /// Deposit exactly the monthly amount of a formal account
    pub async fn monthly_deposit(
        &self,
        account_id: i64,
        description: Option<&str>,
    ) -> Result<LedgerReceipt, AppError> {
        let account = self.account(account_id).await?;
        let monthly_amount = account.terms.required_monthly_amount().ok_or_else(|| {
            DomainError::invalid_state(format!(
                "Account {} is not a formal account",
                account.account_number
            ))
        })?;

        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_MONTHLY_DESCRIPTION);
        self.deposit(account_id, monthly_amount, Some(description)).await
    }

    // =========================================================================
    // withdraw
    // =========================================================================

    pub async fn withdraw(
        &self,
        account_id: i64,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<LedgerReceipt, AppError> {
        let amount = validate_withdrawal_amount(amount)?;
        let description = resolve_description(description, DEFAULT_WITHDRAWAL_DESCRIPTION)?;

        let mut unit = self.lock(account_id).await?;
        let mut account = unit.account().clone();

        let (from, to) = day_bounds(self.clock.today());
        let withdrawn_today = unit
            .transaction_total(TransactionType::Withdrawal, from, to)
            .await?;
        account.debit(&amount, withdrawn_today)?;

        self.post(unit, account, amount, TransactionType::Withdrawal, description)
            .await
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Ledger of one account, newest first
    pub async fn transactions(&self, account_id: i64) -> Result<Vec<Transaction>, AppError> {
        self.account(account_id).await?;
        Ok(self.store.account_transactions(account_id).await?)
    }

    pub async fn withdrawn_today(&self, account_id: i64) -> Result<Decimal, AppError> {
        self.account(account_id).await?;
        let (from, to) = day_bounds(self.clock.today());
        Ok(self
            .store
            .transaction_total(account_id, TransactionType::Withdrawal, from, to)
            .await?)
    }

    pub async fn deposited_this_month(&self, account_id: i64) -> Result<Decimal, AppError> {
        self.account(account_id).await?;
        let (from, to) = month_bounds(self.clock.today());
        Ok(self
            .store
            .transaction_total(account_id, TransactionType::Deposit, from, to)
            .await?)
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Transaction, AppError> {
        self.store
            .find_transaction_by_reference(reference)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction", reference).into())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn account(&self, account_id: i64) -> Result<SavingAccount, AppError> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id).into())
    }

    async fn lock(&self, account_id: i64) -> Result<Box<dyn LedgerUnit>, AppError> {
        Ok(self
            .store
            .begin_ledger(account_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", account_id))?)
    }

    async fn fresh_reference(&self, unit: &mut dyn LedgerUnit) -> Result<String, AppError> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let reference = self.numbers.reference_number();
            if !unit.reference_exists(&reference).await? {
                return Ok(reference);
            }
            tracing::debug!(reference = %reference, "Reference number collision, retrying");
        }
        Err(AppError::Internal(
            "Could not allocate a unique reference number".to_string(),
        ))
    }

    /// Append the entry and write the updated account, then commit
    async fn post(
        &self,
        mut unit: Box<dyn LedgerUnit>,
        account: SavingAccount,
        amount: Amount,
        kind: TransactionType,
        description: String,
    ) -> Result<LedgerReceipt, AppError> {
        let reference = self.fresh_reference(unit.as_mut()).await?;
        let entry = NewTransaction::new(
            account.id,
            amount,
            kind,
            Some(description),
            reference,
            self.clock.now(),
        )?;

        let transaction = unit.post(&account, entry).await?;

        tracing::info!(
            account_id = account.id,
            account_number = %account.account_number,
            reference = %transaction.reference_number,
            amount = %amount,
            balance = %account.current_balance,
            "{} posted",
            kind
        );

        Ok(LedgerReceipt {
            account_id: account.id,
            account_number: account.account_number,
            new_balance: account.current_balance.value(),
            transaction,
        })
    }
}
