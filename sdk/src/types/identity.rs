//! The authenticated principal.
//!
//! [`Profile`] is the full "me" record returned by the API; [`Identity`] is
//! the minimal projection of it that decides which entity context mounts
//! and which channels get subscribed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::ChannelName;
use crate::error::SdkError;

/// Discriminates company-side users from wms-side users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// A member of a company.
    Company,
    /// A member of a warehouse-management tenant.
    Wms,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Company => write!(f, "company"),
            Self::Wms => write!(f, "wms"),
        }
    }
}

impl FromStr for UserType {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Self::Company),
            "wms" => Ok(Self::Wms),
            other => Err(SdkError::InvalidUserType(other.to_string())),
        }
    }
}

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// User id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Login email.
    pub email: String,

    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Which side of the platform the user belongs to.
    pub user_type: UserType,

    /// Company the user belongs to.
    #[serde(rename = "companyID", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    /// Wms tenant the user belongs to.
    #[serde(rename = "wmsID", default, skip_serializing_if = "Option::is_none")]
    pub wms_id: Option<String>,

    /// Role assigned within the company or wms.
    #[serde(rename = "roleID", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,

    /// Last profile change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Minimal identity used to scope subscriptions and fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// User id.
    pub id: String,

    /// Discriminated user type.
    pub user_type: UserType,

    /// Company foreign key.
    #[serde(rename = "companyID", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    /// Wms foreign key.
    #[serde(rename = "wmsID", default, skip_serializing_if = "Option::is_none")]
    pub wms_id: Option<String>,

    /// Role foreign key.
    #[serde(rename = "roleID", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
}

impl Identity {
    /// Creates a company-side identity.
    #[must_use]
    pub fn company(id: impl Into<String>, company_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_type: UserType::Company,
            company_id: Some(company_id.into()),
            wms_id: None,
            role_id: None,
        }
    }

    /// Creates a wms-side identity.
    #[must_use]
    pub fn wms(id: impl Into<String>, wms_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_type: UserType::Wms,
            company_id: None,
            wms_id: Some(wms_id.into()),
            role_id: None,
        }
    }

    /// Sets the role id.
    #[must_use]
    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        self.role_id = Some(role_id.into());
        self
    }

    /// The user's own channel.
    #[must_use]
    pub fn user_channel(&self) -> ChannelName {
        ChannelName::user(&self.id)
    }

    /// The foreign key required by the user's type, if present.
    #[must_use]
    pub fn scope_key(&self) -> Option<&str> {
        match self.user_type {
            UserType::Company => self.company_id.as_deref(),
            UserType::Wms => self.wms_id.as_deref(),
        }
    }

    /// Checks that the key required by the user's type is present.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::MissingScopeKey` if it is absent.
    pub fn require_scope_key(&self) -> Result<&str, SdkError> {
        self.scope_key().ok_or_else(|| SdkError::MissingScopeKey {
            user_type: self.user_type.to_string(),
            field: match self.user_type {
                UserType::Company => "companyID",
                UserType::Wms => "wmsID",
            },
        })
    }
}

impl From<&Profile> for Identity {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            user_type: profile.user_type,
            company_id: profile.company_id.clone(),
            wms_id: profile.wms_id.clone(),
            role_id: profile.role_id.clone(),
        }
    }
}
