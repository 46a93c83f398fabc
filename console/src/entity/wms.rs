//! The wms-side entity context.
//!
//! Keyed by the identity's wms id and bound to `wms:<wmsID>`.

use std::sync::Arc;

use async_trait::async_trait;
use wmsync_sdk::client::ApiLayer;
use wmsync_sdk::types::{ChannelScope, Identity, Invitation, Permission, Role, User, Wms};

use super::context::{EntityContext, EntityScope, ScopedEvent};
use super::slice::{FetchKey, Slice};

/// Slices of the wms context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WmsSlice {
    /// The wms tenant itself.
    Wms,
    /// Roles defined in the tenant.
    Roles,
    /// Tenant members.
    Users,
    /// Grantable permissions.
    Permissions,
    /// Issued invitations.
    Invitations,
}

/// Events on a wms channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WmsEvent {
    /// Tenant details changed.
    WmsUpdated,
    /// A role was created.
    RoleCreated,
    /// A role was renamed or described.
    RoleUpdated,
    /// A role was deleted.
    RoleDeleted,
    /// A role's permission set changed.
    RolePermissionsChanged,
    /// A member moved to another role.
    RoleReassigned,
    /// A user joined the tenant.
    UserJoined,
    /// A user left the tenant.
    UserLeft,
    /// A member changed.
    UserUpdated,
    /// The grantable permission catalog changed.
    PermissionsChanged,
    /// An invitation was issued.
    InvitationCreated,
    /// An invitation was accepted.
    InvitationAccepted,
    /// An invitation was cancelled.
    InvitationCancelled,
    /// An invitation expired.
    InvitationExpired,
}

impl WmsEvent {
    /// Every event, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::WmsUpdated,
        Self::RoleCreated,
        Self::RoleUpdated,
        Self::RoleDeleted,
        Self::RolePermissionsChanged,
        Self::RoleReassigned,
        Self::UserJoined,
        Self::UserLeft,
        Self::UserUpdated,
        Self::PermissionsChanged,
        Self::InvitationCreated,
        Self::InvitationAccepted,
        Self::InvitationCancelled,
        Self::InvitationExpired,
    ];
}

impl ScopedEvent for WmsEvent {
    type Slice = WmsSlice;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }

    fn name(self) -> &'static str {
        match self {
            Self::WmsUpdated => "WmsUpdated",
            Self::RoleCreated => "RoleCreated",
            Self::RoleUpdated => "RoleUpdated",
            Self::RoleDeleted => "RoleDeleted",
            Self::RolePermissionsChanged => "RolePermissionsChanged",
            Self::RoleReassigned => "RoleReassigned",
            Self::UserJoined => "UserJoined",
            Self::UserLeft => "UserLeft",
            Self::UserUpdated => "UserUpdated",
            Self::PermissionsChanged => "PermissionsChanged",
            Self::InvitationCreated => "InvitationCreated",
            Self::InvitationAccepted => "InvitationAccepted",
            Self::InvitationCancelled => "InvitationCancelled",
            Self::InvitationExpired => "InvitationExpired",
        }
    }

    fn refetches(self) -> &'static [WmsSlice] {
        match self {
            Self::WmsUpdated => &[WmsSlice::Wms],
            Self::RoleCreated | Self::RoleUpdated | Self::RoleDeleted => &[WmsSlice::Roles],
            Self::RolePermissionsChanged => &[WmsSlice::Roles, WmsSlice::Permissions],
            Self::RoleReassigned => &[WmsSlice::Roles, WmsSlice::Users],
            Self::UserJoined | Self::UserLeft | Self::UserUpdated => &[WmsSlice::Users],
            Self::PermissionsChanged => &[WmsSlice::Permissions],
            Self::InvitationCreated | Self::InvitationCancelled | Self::InvitationExpired => {
                &[WmsSlice::Invitations]
            }
            Self::InvitationAccepted => &[WmsSlice::Invitations, WmsSlice::Users],
        }
    }
}

/// Slices and fetches of the wms context.
pub struct WmsScope {
    api: Arc<dyn ApiLayer>,
    wms: Slice<Wms>,
    roles: Slice<Vec<Role>>,
    users: Slice<Vec<User>>,
    permissions: Slice<Vec<Permission>>,
    invitations: Slice<Vec<Invitation>>,
}

impl WmsScope {
    /// Creates empty slices fetched through `api`.
    #[must_use]
    pub fn new(api: Arc<dyn ApiLayer>, discard_stale: bool) -> Self {
        Self {
            api,
            wms: Slice::new("wms", discard_stale),
            roles: Slice::new("roles", discard_stale),
            users: Slice::new("users", discard_stale),
            permissions: Slice::new("permissions", discard_stale),
            invitations: Slice::new("invitations", discard_stale),
        }
    }

    /// The wms tenant.
    #[must_use]
    pub fn wms(&self) -> &Slice<Wms> {
        &self.wms
    }

    /// The tenant's roles.
    #[must_use]
    pub fn roles(&self) -> &Slice<Vec<Role>> {
        &self.roles
    }

    /// The tenant's members.
    #[must_use]
    pub fn users(&self) -> &Slice<Vec<User>> {
        &self.users
    }

    /// The grantable permissions.
    #[must_use]
    pub fn permissions(&self) -> &Slice<Vec<Permission>> {
        &self.permissions
    }

    /// The tenant's invitations.
    #[must_use]
    pub fn invitations(&self) -> &Slice<Vec<Invitation>> {
        &self.invitations
    }

    /// Invitations still waiting for an answer.
    #[must_use]
    pub fn pending_invitations(&self) -> Vec<Invitation> {
        self.invitations
            .value()
            .unwrap_or_default()
            .into_iter()
            .filter(Invitation::is_pending)
            .collect()
    }
}

#[async_trait]
impl EntityScope for WmsScope {
    type Slice = WmsSlice;
    type Event = WmsEvent;

    const NAME: &'static str = "wms";
    const CHANNEL_SCOPE: ChannelScope = ChannelScope::Wms;
    const SLICES: &'static [WmsSlice] = &[
        WmsSlice::Wms,
        WmsSlice::Roles,
        WmsSlice::Users,
        WmsSlice::Permissions,
        WmsSlice::Invitations,
    ];

    fn scope_id(identity: &Identity) -> Option<&str> {
        identity.wms_id.as_deref()
    }

    async fn refetch(&self, slice: WmsSlice, id: &str, key: &FetchKey) {
        match slice {
            WmsSlice::Wms => {
                self.wms.load(key, self.api.fetch_wms(id)).await;
            }
            WmsSlice::Roles => {
                self.roles.load(key, self.api.fetch_wms_roles(id)).await;
            }
            WmsSlice::Users => {
                self.users.load(key, self.api.fetch_wms_users(id)).await;
            }
            WmsSlice::Permissions => {
                self.permissions
                    .load(key, self.api.fetch_wms_permissions(id))
                    .await;
            }
            WmsSlice::Invitations => {
                self.invitations
                    .load(key, self.api.fetch_wms_invitations(id))
                    .await;
            }
        }
    }

    fn clear(&self) {
        self.wms.clear();
        self.roles.clear();
        self.users.clear();
        self.permissions.clear();
        self.invitations.clear();
    }
}

/// Entity context for wms-side users.
pub type MyWmsContext = EntityContext<WmsScope>;
