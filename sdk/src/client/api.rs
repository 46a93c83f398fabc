//! The API-layer seam.
//!
//! Every call the sync core makes against the REST API goes through
//! [`ApiLayer`], so contexts can be driven by a real [`super::WmsClient`]
//! or by an in-process fake.

use async_trait::async_trait;

use super::error::ClientError;
use crate::types::{
    ChannelName, Company, Invitation, Permission, Profile, Role, User, Warehouse, Wms,
};

/// Reads (and the realtime control-plane writes) used by the sync core.
#[async_trait]
pub trait ApiLayer: Send + Sync {
    /// Fetches the authenticated user's profile.
    async fn fetch_me(&self) -> Result<Profile, ClientError>;

    /// Fetches a company.
    async fn fetch_company(&self, company_id: &str) -> Result<Company, ClientError>;

    /// Fetches the warehouses contracted by a company.
    async fn fetch_company_warehouses(
        &self,
        company_id: &str,
    ) -> Result<Vec<Warehouse>, ClientError>;

    /// Fetches the members of a company.
    async fn fetch_company_users(&self, company_id: &str) -> Result<Vec<User>, ClientError>;

    /// Fetches a wms tenant.
    async fn fetch_wms(&self, wms_id: &str) -> Result<Wms, ClientError>;

    /// Fetches the members of a wms tenant.
    async fn fetch_wms_users(&self, wms_id: &str) -> Result<Vec<User>, ClientError>;

    /// Fetches the roles defined in a wms tenant.
    async fn fetch_wms_roles(&self, wms_id: &str) -> Result<Vec<Role>, ClientError>;

    /// Fetches the permissions grantable in a wms tenant.
    async fn fetch_wms_permissions(&self, wms_id: &str) -> Result<Vec<Permission>, ClientError>;

    /// Fetches the invitations issued by a wms tenant.
    async fn fetch_wms_invitations(&self, wms_id: &str) -> Result<Vec<Invitation>, ClientError>;

    /// Registers interest in a channel with the event-stream endpoint.
    async fn subscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError>;

    /// Withdraws interest in a channel from the event-stream endpoint.
    async fn unsubscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError>;
}
