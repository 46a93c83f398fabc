//! The company-side entity context.
//!
//! Keyed by the identity's company id and bound to `company:<companyID>`.

use std::sync::Arc;

use async_trait::async_trait;
use wmsync_sdk::client::ApiLayer;
use wmsync_sdk::types::{ChannelScope, Company, Identity, User, Warehouse};

use super::context::{EntityContext, EntityScope, ScopedEvent};
use super::slice::{FetchKey, Slice};

/// Slices of the company context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanySlice {
    /// The company itself.
    Company,
    /// Warehouses contracted by the company.
    Warehouses,
    /// Company members.
    Users,
}

/// Events on a company channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanyEvent {
    /// The company was renamed.
    CompanyNameChanged,
    /// Company details changed.
    CompanyUpdated,
    /// Ownership moved to another user.
    CompanyTransferred,
    /// A warehouse was contracted.
    WarehouseCreated,
    /// A warehouse changed.
    WarehouseUpdated,
    /// A warehouse was removed.
    WarehouseDeleted,
    /// A user joined the company.
    UserJoined,
    /// A user left the company.
    UserLeft,
    /// A member changed.
    UserUpdated,
}

impl CompanyEvent {
    /// Every event, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::CompanyNameChanged,
        Self::CompanyUpdated,
        Self::CompanyTransferred,
        Self::WarehouseCreated,
        Self::WarehouseUpdated,
        Self::WarehouseDeleted,
        Self::UserJoined,
        Self::UserLeft,
        Self::UserUpdated,
    ];
}

impl ScopedEvent for CompanyEvent {
    type Slice = CompanySlice;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }

    fn name(self) -> &'static str {
        match self {
            Self::CompanyNameChanged => "CompanyNameChanged",
            Self::CompanyUpdated => "CompanyUpdated",
            Self::CompanyTransferred => "CompanyTransferred",
            Self::WarehouseCreated => "WarehouseCreated",
            Self::WarehouseUpdated => "WarehouseUpdated",
            Self::WarehouseDeleted => "WarehouseDeleted",
            Self::UserJoined => "UserJoined",
            Self::UserLeft => "UserLeft",
            Self::UserUpdated => "UserUpdated",
        }
    }

    fn refetches(self) -> &'static [CompanySlice] {
        match self {
            Self::CompanyNameChanged | Self::CompanyUpdated => &[CompanySlice::Company],
            Self::CompanyTransferred => &[
                CompanySlice::Company,
                CompanySlice::Warehouses,
                CompanySlice::Users,
            ],
            Self::WarehouseCreated | Self::WarehouseUpdated | Self::WarehouseDeleted => {
                &[CompanySlice::Warehouses]
            }
            Self::UserJoined | Self::UserLeft | Self::UserUpdated => &[CompanySlice::Users],
        }
    }
}

/// Slices and fetches of the company context.
pub struct CompanyScope {
    api: Arc<dyn ApiLayer>,
    company: Slice<Company>,
    warehouses: Slice<Vec<Warehouse>>,
    users: Slice<Vec<User>>,
}

impl CompanyScope {
    /// Creates empty slices fetched through `api`.
    #[must_use]
    pub fn new(api: Arc<dyn ApiLayer>, discard_stale: bool) -> Self {
        Self {
            api,
            company: Slice::new("company", discard_stale),
            warehouses: Slice::new("warehouses", discard_stale),
            users: Slice::new("users", discard_stale),
        }
    }

    /// The company.
    #[must_use]
    pub fn company(&self) -> &Slice<Company> {
        &self.company
    }

    /// The company's warehouses.
    #[must_use]
    pub fn warehouses(&self) -> &Slice<Vec<Warehouse>> {
        &self.warehouses
    }

    /// The company's members.
    #[must_use]
    pub fn users(&self) -> &Slice<Vec<User>> {
        &self.users
    }
}

#[async_trait]
impl EntityScope for CompanyScope {
    type Slice = CompanySlice;
    type Event = CompanyEvent;

    const NAME: &'static str = "company";
    const CHANNEL_SCOPE: ChannelScope = ChannelScope::Company;
    const SLICES: &'static [CompanySlice] = &[
        CompanySlice::Company,
        CompanySlice::Warehouses,
        CompanySlice::Users,
    ];

    fn scope_id(identity: &Identity) -> Option<&str> {
        identity.company_id.as_deref()
    }

    async fn refetch(&self, slice: CompanySlice, id: &str, key: &FetchKey) {
        match slice {
            CompanySlice::Company => {
                self.company.load(key, self.api.fetch_company(id)).await;
            }
            CompanySlice::Warehouses => {
                self.warehouses
                    .load(key, self.api.fetch_company_warehouses(id))
                    .await;
            }
            CompanySlice::Users => {
                self.users.load(key, self.api.fetch_company_users(id)).await;
            }
        }
    }

    fn clear(&self) {
        self.company.clear();
        self.warehouses.clear();
        self.users.clear();
    }
}

/// Entity context for company-side users.
pub type MyCompanyContext = EntityContext<CompanyScope>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_round_trip() {
        for event in CompanyEvent::ALL {
            assert_eq!(CompanyEvent::from_name(event.name()), Some(event));
        }
        assert_eq!(CompanyEvent::from_name("RoleCreated"), None);
        assert_eq!(CompanyEvent::from_name("userjoined"), None);
    }

    #[test]
    fn test_refetch_table() {
        assert_eq!(
            CompanyEvent::UserJoined.refetches(),
            &[CompanySlice::Users]
        );
        assert_eq!(
            CompanyEvent::CompanyNameChanged.refetches(),
            &[CompanySlice::Company]
        );
        assert_eq!(
            CompanyEvent::WarehouseDeleted.refetches(),
            &[CompanySlice::Warehouses]
        );
        assert_eq!(
            CompanyEvent::CompanyTransferred.refetches(),
            CompanyScope::SLICES
        );
    }

    #[test]
    fn test_every_event_refetches_something() {
        for event in CompanyEvent::ALL {
            assert!(!event.refetches().is_empty(), "{:?}", event);
        }
    }

    #[test]
    fn test_scope_id() {
        let identity = Identity::company("u1", "c1");
        assert_eq!(CompanyScope::scope_id(&identity), Some("c1"));
        assert_eq!(CompanyScope::scope_id(&Identity::wms("u2", "w1")), None);
    }
}
