//! Composition root: wires the transport and contexts for one session.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::info;
use wmsync_sdk::client::ApiLayer;
use wmsync_sdk::realtime::{ChannelStrategy, Connector, RealtimeError, RealtimeTransport};
use wmsync_sdk::token::{TokenStore, Tokens};

use crate::config::SyncConfig;
use crate::entity::MeContext;
use crate::realtime_context::RealtimeContext;
use crate::selector::EntitySelector;

/// The running sync core.
pub struct SyncApp {
    config: SyncConfig,
    tokens: Arc<dyn TokenStore>,
    realtime: RealtimeContext,
    me: Arc<MeContext>,
    selector: Arc<EntitySelector>,
    drivers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncApp")
            .field("realtime", &self.realtime)
            .field("me", &self.me)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

impl SyncApp {
    /// Builds the transport over `connector`, mounts the realtime context,
    /// the me context and the entity selector, and spawns their drivers.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the realtime configuration is invalid.
    pub fn start(
        config: SyncConfig,
        api: Arc<dyn ApiLayer>,
        tokens: Arc<dyn TokenStore>,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, RealtimeError> {
        let strategy = ChannelStrategy::for_variant(config.realtime.variant, Arc::clone(&api));
        let transport = RealtimeTransport::new(
            config.realtime.clone(),
            Arc::clone(&tokens),
            connector,
            strategy,
        )?;

        let realtime = RealtimeContext::new(transport);
        realtime.mount();

        let me = Arc::new(MeContext::new(
            Arc::clone(&api),
            realtime.clone(),
            config.discard_stale_fetches,
        ));
        let selector = Arc::new(EntitySelector::new(
            api,
            realtime.clone(),
            me.watch_identity(),
            config.discard_stale_fetches,
        ));
        let drivers = vec![me.spawn(), selector.spawn()];

        info!("sync core started ({:?} transport)", config.realtime.variant);
        Ok(Self {
            config,
            tokens,
            realtime,
            me,
            selector,
            drivers: Mutex::new(drivers),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the realtime context.
    #[must_use]
    pub fn realtime(&self) -> &RealtimeContext {
        &self.realtime
    }

    /// Returns the me context.
    #[must_use]
    pub fn me(&self) -> &Arc<MeContext> {
        &self.me
    }

    /// Returns the entity selector.
    #[must_use]
    pub fn selector(&self) -> &Arc<EntitySelector> {
        &self.selector
    }

    /// Starts a session: stores the tokens, connects and loads the profile.
    /// The matching entity context is mounted before this returns; its
    /// initial fetches continue in the background.
    pub async fn login(&self, tokens: Tokens) {
        self.tokens.set_tokens(tokens);
        self.realtime.connect();
        self.me.load().await;
        self.selector.refresh().await;
        info!("session started");
    }

    /// Ends the session: clears identity and slices, forgets the tokens and
    /// closes the connection normally.
    pub async fn logout(&self) {
        self.selector.unmount().await;
        self.me.clear().await;
        self.tokens.clear();
        self.realtime.disconnect();
        info!("session ended");
    }

    /// Stops every driver and unmounts everything.
    pub async fn shutdown(&self) {
        let drivers = std::mem::take(
            &mut *self
                .drivers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for driver in drivers {
            driver.abort();
        }
        self.selector.unmount().await;
        self.me.unmount().await;
        self.realtime.unmount();
        info!("sync core stopped");
    }
}
