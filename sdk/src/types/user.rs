//! Member users as listed by company and wms endpoints.

use serde::{Deserialize, Serialize};

use super::identity::UserType;

/// A member of a company or wms tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Login email.
    pub email: String,

    /// Side of the platform.
    pub user_type: UserType,

    /// Assigned role.
    #[serde(rename = "roleID", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
