//! Access control
//!
//! Staff roles and the operations each role may perform. Roles are nested:
//! ADMIN can do everything MANAGER can, MANAGER everything ASSISTANT can.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Assistant => "ASSISTANT",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Assistant => 1,
        }
    }

    /// Check whether this role reaches `other` in the hierarchy
    pub fn includes(&self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    pub fn permits(&self, operation: Operation) -> bool {
        match operation.minimum_role() {
            Some(required) => self.includes(required),
            None => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "ASSISTANT" => Ok(Role::Assistant),
            other => Err(DomainError::invalid_argument(format!("Unknown role: {other}"))),
        }
    }
}

/// Every externally reachable operation, grouped by the role it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RegisterMember,

    // Assistant and above
    ListMembers,
    CheckEligibility,
    ViewShareValue,
    PurchaseShares,
    OpenAccount,
    ViewAccounts,
    Deposit,
    Withdraw,
    ViewTransactions,

    // Manager and above
    ViewMember,
    UpdateMember,
    DeactivateMember,
    ReactivateMember,
    CloseAccount,
    DeactivateAccount,
    ReactivateAccount,
    BulkDeposit,
}

impl Operation {
    /// Lowest role allowed to perform the operation; `None` means public.
    pub fn minimum_role(&self) -> Option<Role> {
        use Operation::*;
        match self {
            RegisterMember => None,
            ListMembers | CheckEligibility | ViewShareValue | PurchaseShares | OpenAccount
            | ViewAccounts | Deposit | Withdraw | ViewTransactions => Some(Role::Assistant),
            ViewMember | UpdateMember | DeactivateMember | ReactivateMember | CloseAccount
            | DeactivateAccount | ReactivateAccount | BulkDeposit => Some(Role::Manager),
        }
    }
}

/// An operator authenticated by API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub key_hash: String,
    pub is_active: bool,
}

impl Staff {
    /// Build a staff record for a plaintext API key; only the hash is kept.
    pub fn new(username: impl Into<String>, role: Role, api_key: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
            key_hash: hash_api_key(api_key),
            is_active: true,
        }
    }
}

/// SHA-256 hex digest of an API key, as stored in `staff_api_keys.key_hash`
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}
