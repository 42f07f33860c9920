//! Store Errors
//!
//! Error types for persistence operations. Business rule failures never
//! appear here; they are `DomainError`s raised before the store is touched.

/// Errors that can occur in a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// Row vanished between read and write
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A persisted row could not be mapped back into a domain value
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn unique(constraint: impl Into<String>) -> Self {
        Self::UniqueViolation {
            constraint: constraint.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }

    /// Translate a sqlx error, lifting unique violations out of the
    /// driver-specific error
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::unique(db_err.constraint().unwrap_or("unique"));
            }
        }
        Self::Database(err)
    }
}
