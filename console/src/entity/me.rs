//! The authenticated user's own context.
//!
//! Holds the profile, derives the [`Identity`] everything else is keyed
//! by, and refetches the profile on events on `user:<id>`. Identity
//! watchers are only woken when the identity actually changes, so a name
//! or avatar change never disturbs the other contexts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wmsync_sdk::client::ApiLayer;
use wmsync_sdk::realtime::InboundEvent;
use wmsync_sdk::types::{ChannelName, Identity, Profile};

use super::binding::ChannelBinding;
use super::context::ScopedEvent;
use super::slice::{ScopeTracker, Slice};
use crate::realtime_context::RealtimeContext;

/// Slices of the me context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeSlice {
    /// The user's profile.
    Profile,
}

/// Events on a user channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeEvent {
    /// Profile details changed.
    ProfileUpdated,
    /// The user was renamed.
    NameChanged,
    /// The avatar changed.
    AvatarChanged,
    /// The user moved to another role.
    RoleReassigned,
    /// The user moved to another company.
    CompanyChanged,
    /// The user moved to another wms tenant.
    WmsChanged,
}

impl MeEvent {
    /// Every event, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::ProfileUpdated,
        Self::NameChanged,
        Self::AvatarChanged,
        Self::RoleReassigned,
        Self::CompanyChanged,
        Self::WmsChanged,
    ];
}

impl ScopedEvent for MeEvent {
    type Slice = MeSlice;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.name() == name)
    }

    fn name(self) -> &'static str {
        match self {
            Self::ProfileUpdated => "ProfileUpdated",
            Self::NameChanged => "NameChanged",
            Self::AvatarChanged => "AvatarChanged",
            Self::RoleReassigned => "RoleReassigned",
            Self::CompanyChanged => "CompanyChanged",
            Self::WmsChanged => "WmsChanged",
        }
    }

    fn refetches(self) -> &'static [MeSlice] {
        &[MeSlice::Profile]
    }
}

/// The logged-in user's profile and identity.
pub struct MeContext {
    api: Arc<dyn ApiLayer>,
    realtime: RealtimeContext,
    profile: Slice<Profile>,
    identity: watch::Sender<Option<Identity>>,
    binding: ChannelBinding,
    tracker: ScopeTracker,
    mounted: AtomicBool,
}

impl std::fmt::Debug for MeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeContext")
            .field("identity", &self.identity())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

impl MeContext {
    /// Creates a mounted context with no identity.
    #[must_use]
    pub fn new(api: Arc<dyn ApiLayer>, realtime: RealtimeContext, discard_stale: bool) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            api,
            binding: ChannelBinding::new(realtime.clone()),
            realtime,
            profile: Slice::new("profile", discard_stale),
            identity,
            tracker: ScopeTracker::new(),
            mounted: AtomicBool::new(true),
        }
    }

    /// The profile slice.
    #[must_use]
    pub fn profile(&self) -> &Slice<Profile> {
        &self.profile
    }

    /// The current identity.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    /// Watches identity changes.
    #[must_use]
    pub fn watch_identity(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Returns the channel currently subscribed.
    pub async fn bound_channel(&self) -> Option<ChannelName> {
        self.binding.bound().await
    }

    /// Returns true until [`Self::unmount`].
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Fetches the profile and publishes the identity derived from it.
    ///
    /// A failed fetch nulls the profile and records the error but leaves
    /// the identity alone; only [`Self::clear`] removes it.
    pub async fn load(&self) {
        if !self.is_mounted() {
            return;
        }
        let key = self.tracker.key();
        if !self.profile.load(&key, self.api.fetch_me()).await {
            return;
        }

        if let Some(profile) = self.profile.value() {
            let next = Identity::from(&profile);
            self.binding.want(Some(next.user_channel()));
            let changed = self.identity.send_if_modified(|current| {
                if current.as_ref() == Some(&next) {
                    false
                } else {
                    *current = Some(next.clone());
                    true
                }
            });
            if changed {
                info!("identity is {} ({})", next.id, next.user_type);
            }
        }
        self.binding.reconcile().await;
    }

    /// Forgets the profile and identity and releases the user channel.
    pub async fn clear(&self) {
        self.tracker.advance();
        self.profile.clear();
        self.identity.send_if_modified(|current| current.take().is_some());
        self.binding.release().await;
        info!("identity cleared");
    }

    /// Refetches the profile for events on the user's own channel.
    /// Returns the slices refetched.
    pub async fn handle_event(&self, event: &InboundEvent) -> &'static [MeSlice] {
        let Some(identity) = self.identity() else {
            return &[];
        };
        if !event.is_on(&identity.user_channel()) {
            return &[];
        }
        let Some(parsed) = MeEvent::from_name(&event.event) else {
            debug!("me context ignores {}", event.event);
            return &[];
        };

        debug!("{} on {} refetches the profile", parsed.name(), event.channel);
        self.load().await;
        parsed.refetches()
    }

    /// Reloads the profile if a user is logged in. Returns true if a load
    /// was started.
    pub async fn reload(&self) -> bool {
        if self.identity().is_none() {
            return false;
        }
        self.load().await;
        true
    }

    /// Reacts to a connection state change.
    pub async fn on_connection(&self, connected: bool) {
        if connected {
            self.binding.reconcile().await;
        }
    }

    /// Clears everything and stops reacting.
    pub async fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::AcqRel) {
            return;
        }
        self.clear().await;
    }

    /// Spawns the driver: follows the connection state and the event stream
    /// until unmounted.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let ctx = Arc::clone(self);
        let mut state = ctx.realtime.watch_state();
        let mut events = ctx.realtime.events();

        tokio::spawn(async move {
            while ctx.is_mounted() {
                tokio::select! {
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = state.borrow_and_update().is_connected();
                        if connected {
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move { ctx.on_connection(true).await });
                        }
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move {
                                ctx.handle_event(&event).await;
                            });
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("me context missed {} realtime events, reloading the profile", missed);
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move { ctx.reload().await });
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("me context driver stopped");
        })
    }
}
