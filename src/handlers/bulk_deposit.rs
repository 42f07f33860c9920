//! Bulk Deposit Coordinator
//!
//! Fans one deposit out over every active member of a work domain. Each
//! member's deposit commits on its own; a failing member is reported and
//! the run moves on.

use rust_decimal::Decimal;

use crate::aggregate::{Member, WorkDomain};
use crate::domain::DomainError;
use crate::error::AppError;

use super::{
    AccountRegistry, BulkDepositCommand, BulkDepositDetail, BulkDepositResult, LedgerEngine,
    MemberRegistry,
};

pub const DEFAULT_BULK_DESCRIPTION: &str = "Bulk deposit";

#[derive(Clone)]
pub struct BulkDepositCoordinator {
    members: MemberRegistry,
    accounts: AccountRegistry,
    ledger: LedgerEngine,
}

impl BulkDepositCoordinator {
    pub fn new(members: MemberRegistry, accounts: AccountRegistry, ledger: LedgerEngine) -> Self {
        Self {
            members,
            accounts,
            ledger,
        }
    }

    // =========================================================================
    // bulk_deposit_by_domain
    // =========================================================================

    pub async fn bulk_deposit_by_domain(
        &self,
        command: BulkDepositCommand,
    ) -> Result<BulkDepositResult, AppError> {
        let work_domain: WorkDomain = command.work_domain.parse()?;
        if command.amount <= Decimal::ZERO {
            return Err(
                DomainError::invalid_argument("Bulk deposit amount must be positive").into(),
            );
        }
        let description = command
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_BULK_DESCRIPTION)
            .to_string();

        let members: Vec<Member> = self
            .members
            .by_domain(work_domain)
            .await?
            .into_iter()
            .filter(|m| m.is_active)
            .collect();

        let mut result = BulkDepositResult {
            work_domain,
            total_members: members.len(),
            success_count: 0,
            failure_count: 0,
            total_amount: Decimal::ZERO,
            details: Vec::new(),
            errors: Vec::new(),
        };

        for member in &members {
            match self.deposit_for(member, command.amount, &description).await {
                Ok(detail) => {
                    result.success_count += 1;
                    result.total_amount += detail.amount;
                    result.details.push(detail);
                }
                Err(e) => {
                    if e.domain().is_some() {
                        tracing::warn!(
                            employee_id = %member.employee_id,
                            "Bulk deposit skipped member: {}",
                            e
                        );
                    } else {
                        tracing::error!(
                            employee_id = %member.employee_id,
                            "Bulk deposit failed for member: {}",
                            e
                        );
                    }
                    result.failure_count += 1;
                    result
                        .errors
                        .push(format!("{}: {}", member.employee_id, e.public_message()));
                }
            }
        }

        tracing::info!(
            work_domain = %work_domain,
            total_members = result.total_members,
            success_count = result.success_count,
            failure_count = result.failure_count,
            total_amount = %result.total_amount,
            "Bulk deposit completed"
        );
        Ok(result)
    }

    /// Deposit into the member's primary account: the oldest active one
    async fn deposit_for(
        &self,
        member: &Member,
        amount: Decimal,
        description: &str,
    ) -> Result<BulkDepositDetail, AppError> {
        let accounts = self.accounts.active_member_accounts(member.id).await?;
        let primary = accounts
            .first()
            .ok_or_else(|| DomainError::invalid_state("No active account found"))?;

        let receipt = self
            .ledger
            .deposit(primary.id, amount, Some(description))
            .await?;

        Ok(BulkDepositDetail {
            member_id: member.id,
            employee_id: member.employee_id.clone(),
            member_name: member.full_name(),
            account_number: receipt.account_number,
            amount: receipt.transaction.amount.value(),
            reference_number: receipt.transaction.reference_number,
            new_balance: receipt.new_balance,
        })
    }
}
