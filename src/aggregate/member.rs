//! Member Aggregate
//!
//! A cooperative member together with the shares they own. Shares are only
//! ever reached through their member, so the member carries them inline.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::numbering::certificate_number;
use crate::domain::DomainError;

/// Fee charged once at registration (ETB)
pub const REGISTRATION_FEE: i64 = 500;
/// Face value of one share (ETB)
pub const SHARE_VALUE: i64 = 150;
/// Shares issued automatically at registration
pub const INITIAL_SHARES: usize = 3;
/// Active shares needed for good standing
pub const MIN_ACTIVE_SHARES: usize = 3;
pub const MAX_SHARES_PER_PURCHASE: i64 = 10;
pub const MAX_SHARES_PER_MEMBER: usize = 100;
pub const DEFAULT_DEACTIVATION_REASON: &str = "Member request";

// Column widths of the members table
const MAX_EMPLOYEE_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 255;
const MAX_PHONE_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkDomain {
    Academic,
    Administration,
    Contract,
    Other,
}

impl WorkDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkDomain::Academic => "ACADEMIC",
            WorkDomain::Administration => "ADMINISTRATION",
            WorkDomain::Contract => "CONTRACT",
            WorkDomain::Other => "OTHER",
        }
    }
}

impl fmt::Display for WorkDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkDomain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACADEMIC" => Ok(WorkDomain::Academic),
            "ADMINISTRATION" => Ok(WorkDomain::Administration),
            "CONTRACT" => Ok(WorkDomain::Contract),
            "OTHER" => Ok(WorkDomain::Other),
            _ => Err(DomainError::invalid_argument(format!(
                "Invalid work domain: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub id: i64,
    pub member_id: i64,
    pub certificate_number: String,
    pub share_value: Decimal,
    pub purchase_date: NaiveDate,
    pub is_active: bool,
}

/// A share about to be issued; the store assigns ids.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShare {
    pub certificate_number: String,
    pub share_value: Decimal,
    pub purchase_date: NaiveDate,
}

impl NewShare {
    pub fn into_share(self, id: i64, member_id: i64) -> Share {
        Share {
            id,
            member_id,
            certificate_number: self.certificate_number,
            share_value: self.share_value,
            purchase_date: self.purchase_date,
            is_active: true,
        }
    }
}

/// Issue `count` shares whose certificate sequence continues after
/// `existing` shares already held.
pub fn issue_shares(
    employee_id: &str,
    existing: usize,
    count: usize,
    purchase_date: NaiveDate,
) -> Vec<NewShare> {
    (existing + 1..=existing + count)
        .map(|sequence| NewShare {
            certificate_number: certificate_number(employee_id, sequence),
            share_value: Decimal::from(SHARE_VALUE),
            purchase_date,
        })
        .collect()
}

/// Registration input
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub work_domain: WorkDomain,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Profile fields staff may edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemberChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// Member Aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    /// Assigned by the store; 0 until persisted
    pub id: i64,
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub work_domain: WorkDomain,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub registration_date: NaiveDate,
    pub registration_fee: Decimal,
    pub is_active: bool,
    pub deactivation_date: Option<NaiveDate>,
    pub deactivation_reason: Option<String>,
    pub shares: Vec<Share>,
}

fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument(format!("{field} is required")));
    }
    check_length(field, trimmed, max_len)?;
    Ok(trimmed.to_string())
}

fn check_length(field: &str, value: &str, max_len: usize) -> Result<(), DomainError> {
    if value.chars().count() > max_len {
        return Err(DomainError::invalid_argument(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(())
}

fn bounded_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, DomainError> {
    let value = optional_text(value);
    if let Some(text) = &value {
        check_length(field, text, max_len)?;
    }
    Ok(value)
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Member {
    // =========================================================================
    // Member::register()
    // =========================================================================

    /// Build a freshly registered member with the initial share batch.
    /// The result is not yet persisted.
    pub fn register(
        input: NewMember,
        today: NaiveDate,
    ) -> Result<(Self, Vec<NewShare>), DomainError> {
        let employee_id = require_text("Employee ID", &input.employee_id, MAX_EMPLOYEE_ID_LEN)?;
        let first_name = require_text("First name", &input.first_name, MAX_NAME_LEN)?;
        let last_name = require_text("Last name", &input.last_name, MAX_NAME_LEN)?;
        let email = bounded_text("Email", input.email, MAX_EMAIL_LEN)?;
        let phone_number = bounded_text("Phone number", input.phone_number, MAX_PHONE_LEN)?;

        let shares = issue_shares(&employee_id, 0, INITIAL_SHARES, today);
        let member = Self {
            id: 0,
            employee_id,
            first_name,
            last_name,
            work_domain: input.work_domain,
            email,
            phone_number,
            registration_date: today,
            registration_fee: Decimal::from(REGISTRATION_FEE),
            is_active: true,
            deactivation_date: None,
            deactivation_reason: None,
            shares: Vec::new(),
        };

        Ok((member, shares))
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn share_count(&self) -> usize {
        self.shares.len()
    }

    pub fn active_share_count(&self) -> usize {
        self.shares.iter().filter(|s| s.is_active).count()
    }

    /// Active with at least three active shares
    pub fn is_eligible(&self) -> bool {
        self.is_active && self.active_share_count() >= MIN_ACTIVE_SHARES
    }

    /// Face value of every share ever issued, inactive ones included
    pub fn total_share_value(&self) -> Decimal {
        self.shares.iter().map(|s| s.share_value).sum()
    }

    // =========================================================================
    // Member::purchase_shares()
    // =========================================================================

    /// Validate a purchase and return the shares to issue
    pub fn purchase_shares(
        &self,
        count: i64,
        today: NaiveDate,
    ) -> Result<Vec<NewShare>, DomainError> {
        if !self.is_active {
            return Err(DomainError::invalid_state(format!(
                "Member {} is not active",
                self.employee_id
            )));
        }
        if !(1..=MAX_SHARES_PER_PURCHASE).contains(&count) {
            return Err(DomainError::invalid_argument(format!(
                "Share quantity must be between 1 and {MAX_SHARES_PER_PURCHASE}"
            )));
        }

        // count is within 1..=10 here
        let count = count as usize;
        if self.share_count() + count > MAX_SHARES_PER_MEMBER {
            return Err(DomainError::invalid_argument(format!(
                "Cannot exceed {MAX_SHARES_PER_MEMBER} shares per member (currently {})",
                self.share_count()
            )));
        }

        Ok(issue_shares(&self.employee_id, self.share_count(), count, today))
    }

    pub fn deactivate(&mut self, reason: Option<String>, today: NaiveDate) {
        self.is_active = false;
        self.deactivation_date = Some(today);
        self.deactivation_reason = Some(
            optional_text(reason).unwrap_or_else(|| DEFAULT_DEACTIVATION_REASON.to_string()),
        );
    }

    pub fn reactivate(&mut self) -> Result<(), DomainError> {
        if self.active_share_count() < MIN_ACTIVE_SHARES {
            return Err(DomainError::invalid_state(format!(
                "Cannot reactivate member {}: at least {MIN_ACTIVE_SHARES} active shares required",
                self.employee_id
            )));
        }
        self.is_active = true;
        self.deactivation_date = None;
        self.deactivation_reason = None;
        Ok(())
    }

    /// Apply a profile edit. The employee id is immutable.
    pub fn apply_changes(&mut self, changes: MemberChanges) -> Result<(), DomainError> {
        let first_name = match changes.first_name {
            Some(name) => Some(require_text("First name", &name, MAX_NAME_LEN)?),
            None => None,
        };
        let last_name = match changes.last_name {
            Some(name) => Some(require_text("Last name", &name, MAX_NAME_LEN)?),
            None => None,
        };
        let email = match changes.email {
            Some(email) => Some(bounded_text("Email", Some(email), MAX_EMAIL_LEN)?),
            None => None,
        };
        let phone_number = match changes.phone_number {
            Some(phone) => Some(bounded_text("Phone number", Some(phone), MAX_PHONE_LEN)?),
            None => None,
        };

        if let Some(name) = first_name {
            self.first_name = name;
        }
        if let Some(name) = last_name {
            self.last_name = name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(phone) = phone_number {
            self.phone_number = phone;
        }
        Ok(())
    }

    /// Case-insensitive match on names and employee id
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        self.first_name.to_lowercase().contains(&needle)
            || self.last_name.to_lowercase().contains(&needle)
            || self.employee_id.to_lowercase().contains(&needle)
    }
}
