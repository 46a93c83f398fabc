//! Shared fixtures: a scripted API layer and an in-memory transport.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use wmsync_console::RealtimeContext;
use wmsync_sdk::client::{ApiLayer, ClientError};
use wmsync_sdk::realtime::{
    ChannelStrategy, MemoryConnector, MemoryListener, MemoryPeer, Outbound, RealtimeConfig,
    RealtimeTransport,
};
use wmsync_sdk::token::{MemoryTokenStore, Tokens};
use wmsync_sdk::types::{
    ChannelName, Company, Invitation, InvitationStatus, Permission, Profile, Role, User,
    UserType, Warehouse, Wms,
};

#[derive(Default)]
struct Script {
    profile: Option<Profile>,
    calls: Vec<String>,
    failures: HashSet<String>,
    gates: HashMap<String, Arc<Semaphore>>,
}

/// API layer answering from generated data and recording every call as
/// `name:id`. Each answer carries the call's sequence number so refetched
/// values differ from the previous ones.
#[derive(Default)]
pub struct FakeApi {
    script: Mutex<Script>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_profile(profile: Profile) -> Arc<Self> {
        let api = Self::new();
        api.set_profile(profile);
        api
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_profile(&self, profile: Profile) {
        self.script().profile = Some(profile);
    }

    /// Makes every call named `call` (e.g. `fetch_company_users`) fail.
    pub fn fail(&self, call: &str) {
        self.script().failures.insert(call.to_string());
    }

    pub fn succeed(&self, call: &str) {
        self.script().failures.remove(call);
    }

    /// Holds calls to `call:id` until [`Self::release`].
    pub fn hold(&self, call_with_id: &str) {
        self.script()
            .gates
            .insert(call_with_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, call_with_id: &str) {
        if let Some(gate) = self.script().gates.remove(call_with_id) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.script().calls.clone()
    }

    /// Number of calls named `call`, whatever the id.
    pub fn count(&self, call: &str) -> usize {
        let prefix = format!("{}:", call);
        self.script()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    pub fn clear_calls(&self) {
        self.script().calls.clear();
    }

    async fn call(&self, name: &str, id: &str) -> Result<usize, ClientError> {
        let key = format!("{}:{}", name, id);
        let (seq, gate, fails) = {
            let mut script = self.script();
            script.calls.push(key.clone());
            (
                script.calls.len(),
                script.gates.get(&key).cloned(),
                script.failures.contains(name),
            )
        };
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if fails {
            return Err(ClientError::Api {
                path: format!("/{}/{}", name, id),
                code: "unavailable".to_string(),
                message: format!("{} is unavailable", name),
            });
        }
        Ok(seq)
    }
}

pub fn user(id: &str, seq: usize) -> User {
    User {
        id: id.to_string(),
        name: format!("user {} #{}", id, seq),
        email: format!("{}@example.com", id),
        user_type: UserType::Company,
        role_id: None,
        avatar_url: None,
    }
}

#[async_trait]
impl ApiLayer for FakeApi {
    async fn fetch_me(&self) -> Result<Profile, ClientError> {
        self.call("fetch_me", "me").await?;
        self.script().profile.clone().ok_or(ClientError::Unauthorized)
    }

    async fn fetch_company(&self, company_id: &str) -> Result<Company, ClientError> {
        let seq = self.call("fetch_company", company_id).await?;
        Ok(Company {
            id: company_id.to_string(),
            name: format!("company {} #{}", company_id, seq),
            logo_url: None,
            owner_id: None,
            created_at: None,
        })
    }

    async fn fetch_company_warehouses(
        &self,
        company_id: &str,
    ) -> Result<Vec<Warehouse>, ClientError> {
        let seq = self.call("fetch_company_warehouses", company_id).await?;
        Ok(vec![Warehouse {
            id: format!("{}-wh", company_id),
            name: format!("warehouse #{}", seq),
            address: None,
            wms_id: None,
        }])
    }

    async fn fetch_company_users(&self, company_id: &str) -> Result<Vec<User>, ClientError> {
        let seq = self.call("fetch_company_users", company_id).await?;
        Ok(vec![user(&format!("{}-u", company_id), seq)])
    }

    async fn fetch_wms(&self, wms_id: &str) -> Result<Wms, ClientError> {
        let seq = self.call("fetch_wms", wms_id).await?;
        Ok(Wms {
            id: wms_id.to_string(),
            name: format!("wms {} #{}", wms_id, seq),
            warehouse_count: 1,
        })
    }

    async fn fetch_wms_users(&self, wms_id: &str) -> Result<Vec<User>, ClientError> {
        let seq = self.call("fetch_wms_users", wms_id).await?;
        Ok(vec![user(&format!("{}-u", wms_id), seq)])
    }

    async fn fetch_wms_roles(&self, wms_id: &str) -> Result<Vec<Role>, ClientError> {
        let seq = self.call("fetch_wms_roles", wms_id).await?;
        Ok(vec![Role {
            id: format!("{}-admin", wms_id),
            name: format!("admin #{}", seq),
            permissions: vec!["inventory.write".to_string()],
            member_count: 1,
        }])
    }

    async fn fetch_wms_permissions(&self, wms_id: &str) -> Result<Vec<Permission>, ClientError> {
        let seq = self.call("fetch_wms_permissions", wms_id).await?;
        Ok(vec![Permission {
            key: "inventory.write".to_string(),
            description: format!("write inventory #{}", seq),
        }])
    }

    async fn fetch_wms_invitations(&self, wms_id: &str) -> Result<Vec<Invitation>, ClientError> {
        let seq = self.call("fetch_wms_invitations", wms_id).await?;
        Ok(vec![
            Invitation {
                id: format!("inv-{}", seq),
                email: "new@example.com".to_string(),
                role_id: None,
                status: InvitationStatus::Pending,
                expires_at: None,
            },
            Invitation {
                id: "inv-old".to_string(),
                email: "old@example.com".to_string(),
                role_id: None,
                status: InvitationStatus::Expired,
                expires_at: None,
            },
        ])
    }

    async fn subscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError> {
        self.call("subscribe_channel", &channel.to_string()).await?;
        Ok(())
    }

    async fn unsubscribe_channel(&self, channel: &ChannelName) -> Result<(), ClientError> {
        self.call("unsubscribe_channel", &channel.to_string()).await?;
        Ok(())
    }
}

pub fn company_profile(id: &str, company_id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        avatar_url: None,
        user_type: UserType::Company,
        company_id: Some(company_id.to_string()),
        wms_id: None,
        role_id: None,
        updated_at: None,
    }
}

pub fn wms_profile(id: &str, wms_id: &str) -> Profile {
    Profile {
        id: id.to_string(),
        name: "Grace".to_string(),
        email: "grace@example.com".to_string(),
        avatar_url: None,
        user_type: UserType::Wms,
        company_id: None,
        wms_id: Some(wms_id.to_string()),
        role_id: Some("r1".to_string()),
        updated_at: None,
    }
}

pub fn socket_config() -> RealtimeConfig {
    RealtimeConfig::socket("wss://rt.example.com")
        .with_backoff(Duration::from_millis(10), Duration::from_millis(40))
}

/// A mounted realtime context over an in-memory connector, already connected.
pub async fn connected_realtime() -> (RealtimeContext, MemoryListener, MemoryPeer) {
    let (realtime, mut listener) = realtime_with_token(Some("secret"));
    realtime.mount();
    let peer = listener.accept().await.expect("peer");
    let mut state = realtime.watch_state();
    let _ = state.wait_for(|s| s.is_connected()).await;
    (realtime, listener, peer)
}

/// An unmounted realtime context over an in-memory connector.
pub fn realtime_with_token(token: Option<&str>) -> (RealtimeContext, MemoryListener) {
    let (connector, listener) = MemoryConnector::new();
    let tokens = match token {
        Some(token) => MemoryTokenStore::with_tokens(Tokens::new(token)),
        None => MemoryTokenStore::new(),
    };
    let transport = RealtimeTransport::new(
        socket_config(),
        Arc::new(tokens),
        Arc::new(connector),
        ChannelStrategy::InBand,
    )
    .expect("transport");
    (RealtimeContext::new(transport), listener)
}

pub fn control(action: &str, channel: &str) -> Outbound {
    Outbound::Text(format!(
        r#"{{"action":"{}","channel":"{}"}}"#,
        action, channel
    ))
}

/// Polls `check` until it holds, failing the test after a second.
pub async fn eventually<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {}", what);
}
