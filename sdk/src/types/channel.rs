//! Realtime channel names.
//!
//! Channels follow the `<scope>:<id>` convention, where the scope is one of
//! `user`, `company` or `wms` and the id is the owning entity's identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Broadcast scope of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelScope {
    /// Events about a single user.
    User,
    /// Events about a company and its warehouses and members.
    Company,
    /// Events about a warehouse-management tenant.
    Wms,
}

impl ChannelScope {
    /// Returns the scope prefix used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Company => "company",
            Self::Wms => "wms",
        }
    }
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelScope {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "company" => Ok(Self::Company),
            "wms" => Ok(Self::Wms),
            other => Err(SdkError::InvalidScope(other.to_string())),
        }
    }
}

/// A scoped channel name such as `company:c1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName {
    scope: ChannelScope,
    id: String,
}

impl ChannelName {
    /// Creates a channel name for the given scope and entity id.
    #[must_use]
    pub fn new(scope: ChannelScope, id: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
        }
    }

    /// Channel for a single user.
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(ChannelScope::User, id)
    }

    /// Channel for a company.
    #[must_use]
    pub fn company(id: impl Into<String>) -> Self {
        Self::new(ChannelScope::Company, id)
    }

    /// Channel for a wms tenant.
    #[must_use]
    pub fn wms(id: impl Into<String>) -> Self {
        Self::new(ChannelScope::Wms, id)
    }

    /// Returns the scope.
    #[must_use]
    pub const fn scope(&self) -> ChannelScope {
        self.scope
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if a raw channel string from the wire names this channel.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        raw.split_once(':')
            .is_some_and(|(scope, id)| scope == self.scope.as_str() && id == self.id)
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

impl FromStr for ChannelName {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scope, id) = s
            .split_once(':')
            .ok_or_else(|| SdkError::InvalidChannel(s.to_string()))?;
        if id.is_empty() {
            return Err(SdkError::InvalidChannel(s.to_string()));
        }
        Ok(Self::new(scope.parse()?, id))
    }
}

impl TryFrom<String> for ChannelName {
    type Error = SdkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelName> for String {
    fn from(value: ChannelName) -> Self {
        value.to_string()
    }
}
