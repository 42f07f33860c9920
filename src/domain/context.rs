//! Operation Context
//!
//! Metadata about the current operation: who is acting and under which
//! correlation id, for authorization and tracing.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use super::access::{Operation, Role};

/// Context for an operation, built by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationContext {
    /// Staff member behind the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
}

impl OperationContext {
    /// Create a new anonymous context
    pub fn new() -> Self {
        Self {
            staff_id: None,
            role: None,
            correlation_id: None,
            client_ip: None,
        }
    }

    pub fn with_staff(mut self, staff_id: Uuid, role: Role) -> Self {
        self.staff_id = Some(staff_id);
        self.role = Some(role);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    /// Whether the caller may perform `operation`.
    /// Anonymous callers only get public operations.
    pub fn permits(&self, operation: Operation) -> bool {
        match self.role {
            Some(role) => role.permits(operation),
            None => operation.minimum_role().is_none(),
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
