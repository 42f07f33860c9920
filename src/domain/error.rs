//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use rust_decimal::Decimal;
use thiserror::Error;

/// Business rule violations and lookup failures raised by the registries
/// and the ledger. Independent of the web and storage layers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// Referenced member, account or transaction does not exist
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A unique business key is already taken
    #[error("Duplicate {field}: {value}")]
    DuplicateKey { field: &'static str, value: String },

    /// A one-per-member resource already exists
    #[error("{0}")]
    AlreadyExists(String),

    /// Malformed or out-of-range input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The entity is in the wrong state for the operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Member does not meet the account-opening requirements
    #[error("Member {member_id} is not eligible to open accounts (active with at least 3 active shares required)")]
    Ineligible { member_id: i64 },

    /// Withdrawal exceeds what the account can give
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// A count or daily cap would be exceeded
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field,
            value: value.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::LimitExceeded(message.into())
    }

    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    /// Stable machine-readable code, used as `error_code` in API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Ineligible { .. } => "INELIGIBLE",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::LimitExceeded(_) => "LIMIT_EXCEEDED",
        }
    }

    /// Check if this is a conflict with existing data (retrying won't help)
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. } | Self::AlreadyExists(_))
    }
}
