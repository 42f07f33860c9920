//! Saving Account Aggregate
//!
//! A savings account is either FORMAL (fixed monthly deposit, no
//! withdrawals) or INFORMAL (free deposits, capped daily withdrawals).
//! The variant-specific fields live in [`AccountTerms`]; the deposit and
//! withdrawal rules are dispatched on it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::clock::same_month;
use crate::domain::{Amount, Balance, DomainError};

/// Smallest monthly commitment for a formal account (ETB)
pub const MIN_MONTHLY_AMOUNT: i64 = 100;
/// Informal accounts a member may hold at once
pub const MAX_INFORMAL_ACCOUNTS: i64 = 2;
pub const DEFAULT_DAILY_WITHDRAWAL_LIMIT: i64 = 10_000;
pub const MIN_DEPOSIT: i64 = 10;
pub const MAX_DEPOSIT: i64 = 50_000;
pub const MIN_WITHDRAWAL: i64 = 50;

/// Annual interest rate for formal accounts, in percent
pub fn default_interest_rate() -> Decimal {
    Decimal::new(70, 1)
}

/// Allowed gap between a formal deposit and its monthly amount
pub fn monthly_amount_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    Formal,
    Informal,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Formal => "FORMAL",
            AccountKind::Informal => "INFORMAL",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FORMAL" => Ok(AccountKind::Formal),
            "INFORMAL" => Ok(AccountKind::Informal),
            other => Err(DomainError::invalid_argument(format!(
                "Unknown account type: {other}"
            ))),
        }
    }
}

/// Variant-specific account fields, tagged by `account_type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountTerms {
    Formal {
        monthly_amount: Decimal,
        last_monthly_deposit_date: Option<NaiveDate>,
        maturity_date: Option<NaiveDate>,
        interest_rate: Decimal,
    },
    Informal {
        target_amount: Option<Decimal>,
        daily_withdrawal_limit: Decimal,
        minimum_balance: Decimal,
    },
}

impl AccountTerms {
    pub fn formal(monthly_amount: Decimal) -> Result<Self, DomainError> {
        if monthly_amount < Decimal::from(MIN_MONTHLY_AMOUNT) {
            return Err(DomainError::invalid_argument(format!(
                "Monthly amount must be at least {MIN_MONTHLY_AMOUNT} ETB"
            )));
        }
        let monthly_amount = term_amount(monthly_amount)?;
        Ok(Self::Formal {
            monthly_amount,
            last_monthly_deposit_date: None,
            maturity_date: None,
            interest_rate: default_interest_rate(),
        })
    }

    pub fn informal(target_amount: Option<Decimal>) -> Result<Self, DomainError> {
        if let Some(target) = target_amount {
            if target <= Decimal::ZERO {
                return Err(DomainError::invalid_argument(
                    "Target amount must be positive",
                ));
            }
        }
        let target_amount = target_amount.map(term_amount).transpose()?;
        Ok(Self::Informal {
            target_amount,
            daily_withdrawal_limit: Decimal::from(DEFAULT_DAILY_WITHDRAWAL_LIMIT),
            minimum_balance: Decimal::ZERO,
        })
    }

    pub fn kind(&self) -> AccountKind {
        match self {
            Self::Formal { .. } => AccountKind::Formal,
            Self::Informal { .. } => AccountKind::Informal,
        }
    }

    pub fn supports_withdrawal(&self) -> bool {
        matches!(self, Self::Informal { .. })
    }

    /// The exact amount every deposit must match, if the variant has one
    pub fn required_monthly_amount(&self) -> Option<Decimal> {
        match self {
            Self::Formal { monthly_amount, .. } => Some(*monthly_amount),
            Self::Informal { .. } => None,
        }
    }
}

/// Terms are stored as NUMERIC(15,2), so they obey the same precision as postings
fn term_amount(value: Decimal) -> Result<Decimal, DomainError> {
    Amount::new(value)
        .map(|amount| amount.value())
        .map_err(|e| DomainError::invalid_argument(e.to_string()))
}

/// Check an amount against the per-deposit bounds
pub fn validate_deposit_amount(amount: Decimal) -> Result<Amount, DomainError> {
    if amount < Decimal::from(MIN_DEPOSIT) {
        return Err(DomainError::invalid_argument(format!(
            "Minimum deposit is {MIN_DEPOSIT} ETB"
        )));
    }
    if amount > Decimal::from(MAX_DEPOSIT) {
        return Err(DomainError::invalid_argument(format!(
            "Maximum deposit is {MAX_DEPOSIT} ETB"
        )));
    }
    Amount::new(amount).map_err(|e| DomainError::invalid_argument(e.to_string()))
}

/// Check an amount against the per-withdrawal minimum
pub fn validate_withdrawal_amount(amount: Decimal) -> Result<Amount, DomainError> {
    if amount < Decimal::from(MIN_WITHDRAWAL) {
        return Err(DomainError::invalid_argument(format!(
            "Minimum withdrawal is {MIN_WITHDRAWAL} ETB"
        )));
    }
    Amount::new(amount).map_err(|e| DomainError::invalid_argument(e.to_string()))
}

/// Saving Account Aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingAccount {
    /// Assigned by the store; 0 until persisted
    pub id: i64,
    pub account_number: String,
    pub member_id: i64,
    pub current_balance: Balance,
    pub opening_date: NaiveDate,
    pub is_active: bool,
    #[serde(flatten)]
    pub terms: AccountTerms,
}

impl SavingAccount {
    /// A new, empty, active account
    pub fn open(
        member_id: i64,
        account_number: String,
        terms: AccountTerms,
        opening_date: NaiveDate,
    ) -> Self {
        Self {
            id: 0,
            account_number,
            member_id,
            current_balance: Balance::zero(),
            opening_date,
            is_active: true,
            terms,
        }
    }

    pub fn kind(&self) -> AccountKind {
        self.terms.kind()
    }

    pub fn balance(&self) -> Decimal {
        self.current_balance.value()
    }

    // =========================================================================
    // SavingAccount::credit()
    // =========================================================================

    /// Apply a deposit that already passed the amount bounds.
    ///
    /// Formal accounts take exactly one deposit per calendar month, for the
    /// monthly amount give or take a cent.
    pub fn credit(&mut self, amount: &Amount, today: NaiveDate) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::invalid_state(format!(
                "Cannot deposit to inactive account {}",
                self.account_number
            )));
        }

        if let AccountTerms::Formal {
            monthly_amount,
            last_monthly_deposit_date,
            ..
        } = &self.terms
        {
            if matches!(last_monthly_deposit_date, Some(last) if same_month(*last, today)) {
                return Err(DomainError::invalid_state(format!(
                    "Monthly deposit already made this month for account {}",
                    self.account_number
                )));
            }
            if (amount.value() - *monthly_amount).abs() > monthly_amount_tolerance() {
                return Err(DomainError::invalid_argument(format!(
                    "Must deposit exact monthly amount: {monthly_amount:.2}"
                )));
            }
        }

        self.current_balance = self
            .current_balance
            .credit(amount)
            .map_err(|e| DomainError::invalid_argument(e.to_string()))?;

        if let AccountTerms::Formal {
            last_monthly_deposit_date,
            ..
        } = &mut self.terms
        {
            *last_monthly_deposit_date = Some(today);
        }
        Ok(())
    }

    // =========================================================================
    // SavingAccount::debit()
    // =========================================================================

    /// Apply a withdrawal that already passed the minimum-amount check.
    /// `withdrawn_today` is the sum of today's earlier withdrawals.
    pub fn debit(&mut self, amount: &Amount, withdrawn_today: Decimal) -> Result<(), DomainError> {
        let (daily_limit, minimum_balance) = match &self.terms {
            AccountTerms::Formal { .. } => {
                return Err(DomainError::invalid_state(
                    "Cannot withdraw from formal accounts",
                ))
            }
            AccountTerms::Informal {
                daily_withdrawal_limit,
                minimum_balance,
                ..
            } => (*daily_withdrawal_limit, *minimum_balance),
        };

        if !self.is_active {
            return Err(DomainError::invalid_state(format!(
                "Cannot withdraw from inactive account {}",
                self.account_number
            )));
        }

        if !self.current_balance.is_sufficient_for(amount) {
            return Err(DomainError::insufficient_funds(amount.value(), self.balance()));
        }
        if self.balance() - amount.value() < minimum_balance {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                self.balance() - minimum_balance,
            ));
        }

        if withdrawn_today + amount.value() > daily_limit {
            return Err(DomainError::limit_exceeded(format!(
                "Daily withdrawal limit of {daily_limit:.2} ETB exceeded (already withdrawn today: {withdrawn_today:.2})"
            )));
        }

        self.current_balance = self
            .current_balance
            .debit(amount)
            .map_err(|_| DomainError::insufficient_funds(amount.value(), self.balance()))?;
        Ok(())
    }

    /// Close the account. Only an empty account can be closed.
    pub fn close(&mut self) -> Result<(), DomainError> {
        if !self.current_balance.is_zero() {
            return Err(DomainError::invalid_state(format!(
                "Cannot close account {} with non-zero balance: {}",
                self.account_number, self.current_balance
            )));
        }
        self.is_active = false;
        Ok(())
    }
}
