//! Command definitions
//!
//! Commands carry caller intent into the handlers; results carry back what
//! changed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{NewMember, WorkDomain};
use crate::domain::Transaction;

// =========================================================================
// RegisterMemberCommand
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMemberCommand {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub work_domain: WorkDomain,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

impl RegisterMemberCommand {
    pub fn new(
        employee_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        work_domain: WorkDomain,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            work_domain,
            email: None,
            phone_number: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }
}

impl From<RegisterMemberCommand> for NewMember {
    fn from(command: RegisterMemberCommand) -> Self {
        NewMember {
            employee_id: command.employee_id,
            first_name: command.first_name,
            last_name: command.last_name,
            work_domain: command.work_domain,
            email: command.email,
            phone_number: command.phone_number,
        }
    }
}

// =========================================================================
// BulkDepositCommand
// =========================================================================

/// Deposit the same amount for every active member of a work domain.
/// The domain stays a string here; parsing it is part of the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDepositCommand {
    pub work_domain: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl BulkDepositCommand {
    pub fn new(work_domain: impl Into<String>, amount: Decimal) -> Self {
        Self {
            work_domain: work_domain.into(),
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// =========================================================================
// Results
// =========================================================================

/// Outcome of a deposit or withdrawal
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReceipt {
    pub account_id: i64,
    pub account_number: String,
    pub transaction: Transaction,
    pub new_balance: Decimal,
}

/// One successful deposit inside a bulk run
#[derive(Debug, Clone, Serialize)]
pub struct BulkDepositDetail {
    pub member_id: i64,
    pub employee_id: String,
    pub member_name: String,
    pub account_number: String,
    pub amount: Decimal,
    pub reference_number: String,
    pub new_balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDepositResult {
    pub work_domain: WorkDomain,
    /// Active members of the domain that were attempted
    pub total_members: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_amount: Decimal,
    pub details: Vec<BulkDepositDetail>,
    /// `"{employeeId}: {message}"` per failed member
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberCounts {
    pub active: i64,
    pub inactive: i64,
    pub total: i64,
}
