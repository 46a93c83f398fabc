//! Wms-side entities: the tenant itself, its roles, permissions and
//! pending invitations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A warehouse-management tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wms {
    /// Tenant id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Number of warehouses operated.
    #[serde(default)]
    pub warehouse_count: u32,
}

/// A named permission that can be granted to roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    /// Permission key, e.g. `inventory.write`.
    pub key: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// A role within a wms tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Role id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Granted permission keys.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Number of users holding the role.
    #[serde(default)]
    pub member_count: u32,
}

impl Role {
    /// Returns true if the role grants the given permission key.
    #[must_use]
    pub fn grants(&self, key: &str) -> bool {
        self.permissions.iter().any(|p| p == key)
    }
}

/// Invitation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Sent, awaiting response.
    Pending,
    /// Accepted by the invitee.
    Accepted,
    /// Withdrawn by an admin.
    Cancelled,
    /// Lapsed.
    Expired,
}

/// An invitation to join a wms tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    /// Invitation id.
    pub id: String,

    /// Invitee email.
    pub email: String,

    /// Role granted on acceptance.
    #[serde(rename = "roleID", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    /// Current status.
    pub status: InvitationStatus,

    /// Expiry time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Returns true if the invitation still awaits a response.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}
