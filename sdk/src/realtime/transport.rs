//! The realtime transport state machine.
//!
//! One [`RealtimeTransport`] owns at most one live connection. A supervisor
//! task opens it, pumps inbound frames and, after an abnormal close or a
//! failed attempt, sleeps for a capped exponential backoff before trying
//! again. Teardown bumps a generation counter so that anything a cancelled
//! supervisor still does is ignored.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::config::{RealtimeConfig, TransportVariant};
use super::connection::{
    Connection, ConnectionState, Connector, Frame, Outbound, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};
use super::error::RealtimeError;
use super::messages::{decode_frame, ControlAction, ControlMessage, InboundEvent};
use super::metrics::TransportMetrics;
use super::socket::SocketConnector;
use super::strategy::ChannelStrategy;
use super::stream::StreamConnector;
use crate::client::ApiLayer;
use crate::token::TokenStore;
use crate::types::ChannelName;

#[derive(Debug, Default)]
struct Link {
    /// Bumped by every connect and teardown; stale supervisors compare
    /// against it before touching shared state.
    generation: u64,
    supervisor: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    writable: bool,
    attempt: u32,
    pending_delay: Option<Duration>,
}

struct Inner {
    config: RealtimeConfig,
    backoff: Backoff,
    tokens: Arc<dyn TokenStore>,
    connector: Arc<dyn Connector>,
    strategy: ChannelStrategy,
    state: watch::Sender<ConnectionState>,
    last_event: watch::Sender<Option<InboundEvent>>,
    events: broadcast::Sender<InboundEvent>,
    link: Mutex<Link>,
    subscriptions: Mutex<HashSet<ChannelName>>,
    metrics: TransportMetrics,
}

/// A single authenticated push connection with reconnect.
#[derive(Clone)]
pub struct RealtimeTransport {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RealtimeTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeTransport")
            .field("variant", &self.inner.config.variant)
            .field("strategy", &self.inner.strategy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl RealtimeTransport {
    /// Creates a transport over the given connector and strategy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: RealtimeConfig,
        tokens: Arc<dyn TokenStore>,
        connector: Arc<dyn Connector>,
        strategy: ChannelStrategy,
    ) -> Result<Self, RealtimeError> {
        config.validate()?;

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (last_event, _) = watch::channel(None);
        let (events, _) = broadcast::channel(config.event_buffer);

        Ok(Self {
            inner: Arc::new(Inner {
                backoff: Backoff::new(config.base_delay, config.max_delay),
                config,
                tokens,
                connector,
                strategy,
                state,
                last_event,
                events,
                link: Mutex::new(Link::default()),
                subscriptions: Mutex::new(HashSet::new()),
                metrics: TransportMetrics::new(),
            }),
        })
    }

    /// Creates the transport the configured variant calls for: a socket with
    /// in-band subscriptions, or an event stream whose subscriptions go
    /// through `api`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(
        config: RealtimeConfig,
        tokens: Arc<dyn TokenStore>,
        api: Arc<dyn ApiLayer>,
    ) -> Result<Self, RealtimeError> {
        let strategy = ChannelStrategy::for_variant(config.variant, api);
        match config.variant {
            TransportVariant::Socket => {
                Self::new(config, tokens, Arc::new(SocketConnector::new()), strategy)
            }
            TransportVariant::Stream => {
                Self::new(config, tokens, Arc::new(StreamConnector::new()), strategy)
            }
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    /// Returns the metrics.
    #[must_use]
    pub fn metrics(&self) -> &TransportMetrics {
        &self.inner.metrics
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns true if connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Watches connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Returns the most recently decoded event.
    #[must_use]
    pub fn last_event(&self) -> Option<InboundEvent> {
        self.inner.last_event.borrow().clone()
    }

    /// Watches the most recently decoded event.
    #[must_use]
    pub fn watch_last_event(&self) -> watch::Receiver<Option<InboundEvent>> {
        self.inner.last_event.subscribe()
    }

    /// Receives every decoded event from now on.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<InboundEvent> {
        self.inner.events.subscribe()
    }

    /// Consecutive failures since the last successful open.
    #[must_use]
    pub fn retry_attempt(&self) -> u32 {
        self.inner.lock_link().attempt
    }

    /// Delay of the currently scheduled reconnect, if one is pending.
    #[must_use]
    pub fn pending_retry_delay(&self) -> Option<Duration> {
        self.inner.lock_link().pending_delay
    }

    /// Channels currently wanted by subscribers, sorted by name.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<ChannelName> {
        let mut channels: Vec<ChannelName> =
            self.inner.lock_subscriptions().iter().cloned().collect();
        channels.sort_by_key(ToString::to_string);
        channels
    }

    /// Starts connecting.
    ///
    /// Returns false without doing anything if no access token is available
    /// or a connection is already open, being opened, or scheduled for a
    /// retry. Must be called from within a tokio runtime.
    pub fn connect(&self) -> bool {
        let mut link = self.inner.lock_link();
        if link.supervisor.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("realtime transport already active ({})", self.state());
            return false;
        }
        if self.inner.tokens.access_token().is_none() {
            info!("no access token; realtime connect skipped");
            return false;
        }

        link.generation += 1;
        link.attempt = 0;
        link.pending_delay = None;
        let generation = link.generation;
        self.inner.state.send_replace(ConnectionState::Connecting);
        link.supervisor = Some(tokio::spawn(supervise(Arc::clone(&self.inner), generation)));
        true
    }

    /// Serializes and sends a message over the open connection.
    ///
    /// # Errors
    ///
    /// Returns `RealtimeError::NotConnected` (after logging a warning) if no
    /// connection is open, or a serialization/send error.
    pub fn send<T: Serialize>(&self, message: &T) -> Result<(), RealtimeError> {
        self.inner.send(message)
    }

    /// Registers interest in a channel and asks the server to deliver it.
    ///
    /// The intent is remembered even if the request cannot be made. Returns
    /// true if the request reached the server; failures are logged.
    pub async fn subscribe_channel(&self, channel: &ChannelName) -> bool {
        self.inner.lock_subscriptions().insert(channel.clone());
        self.inner.request(channel, ControlAction::Subscribe).await
    }

    /// Withdraws interest in a channel.
    ///
    /// Returns true if the request reached the server; failures are logged.
    pub async fn unsubscribe_channel(&self, channel: &ChannelName) -> bool {
        self.inner.lock_subscriptions().remove(channel);
        self.inner.request(channel, ControlAction::Unsubscribe).await
    }

    /// Closes the connection with a normal-closure code and cancels any
    /// pending reconnect. The transport can be connected again afterwards.
    pub fn teardown(&self) {
        {
            let mut link = self.inner.lock_link();
            link.generation += 1;
            if let Some(supervisor) = link.supervisor.take() {
                supervisor.abort();
            }
            if let Some(outbound) = link.outbound.take() {
                let _ = outbound.send(Outbound::Close {
                    code: NORMAL_CLOSURE,
                });
            }
            link.writable = false;
            link.attempt = 0;
            link.pending_delay = None;
            self.inner.state.send_replace(ConnectionState::Disconnected);
        }
        self.inner.lock_subscriptions().clear();
        info!("realtime transport torn down");
    }
}

impl Inner {
    fn lock_link(&self) -> MutexGuard<'_, Link> {
        self.link
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_subscriptions(&self) -> MutexGuard<'_, HashSet<ChannelName>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    /// Publishes `state` unless `generation` is stale.
    fn set_state(&self, generation: u64, state: ConnectionState) -> bool {
        let link = self.lock_link();
        if link.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    /// Records a failure and returns the delay before the next attempt, or
    /// None if the supervisor should stop.
    fn schedule_retry(&self, generation: u64) -> Option<Duration> {
        let mut link = self.lock_link();
        if link.generation != generation {
            return None;
        }

        link.attempt = link.attempt.saturating_add(1);
        let attempt = link.attempt;
        if let Some(max) = self.config.max_reconnect_attempts {
            if attempt > max {
                error!("giving up on realtime connection after {} reconnect attempts", max);
                link.pending_delay = None;
                return None;
            }
        }

        let delay = self.backoff.delay(attempt);
        link.pending_delay = Some(delay);
        self.metrics.record_reconnect_scheduled();
        info!("reconnecting in {:?} (attempt {})", delay, attempt);
        Some(delay)
    }

    fn send<T: Serialize>(&self, message: &T) -> Result<(), RealtimeError> {
        let (outbound, writable) = {
            let link = self.lock_link();
            (link.outbound.clone(), link.writable)
        };
        let Some(outbound) = outbound else {
            warn!("realtime transport not connected; message dropped");
            return Err(RealtimeError::NotConnected);
        };
        if !writable {
            warn!("realtime transport is push-only; message dropped");
            return Err(RealtimeError::SendFailed(
                "transport is push-only".to_string(),
            ));
        }

        let json =
            serde_json::to_string(message).map_err(|e| RealtimeError::Serialization(e.to_string()))?;
        outbound
            .send(Outbound::Text(json))
            .map_err(|e| RealtimeError::SendFailed(e.to_string()))
    }

    async fn request(&self, channel: &ChannelName, action: ControlAction) -> bool {
        if !self.is_connected() {
            warn!("realtime transport not connected; {} {} skipped", action, channel);
            return false;
        }

        match action {
            ControlAction::Subscribe => self.metrics.record_subscription(),
            ControlAction::Unsubscribe => self.metrics.record_unsubscription(),
        }

        let result = match &self.strategy {
            ChannelStrategy::InBand => self.send(&ControlMessage {
                action,
                channel: channel.clone(),
            }),
            ChannelStrategy::ControlPlane(api) => match action {
                ControlAction::Subscribe => api.subscribe_channel(channel).await,
                ControlAction::Unsubscribe => api.unsubscribe_channel(channel).await,
            }
            .map_err(|e| RealtimeError::SubscriptionFailed(e.to_string())),
        };

        match result {
            Ok(()) => {
                debug!("{} {}", action, channel);
                true
            }
            Err(e) => {
                self.metrics.record_error();
                warn!("{} {} failed: {}", action, channel, e);
                false
            }
        }
    }

    fn handle_text(&self, text: &str) {
        self.metrics.record_frame();
        match decode_frame(text) {
            Ok(event) => {
                debug!("realtime event {} on {}", event.event, event.channel);
                self.last_event.send_replace(Some(event.clone()));
                let _ = self.events.send(event);
            }
            Err(e) => {
                self.metrics.record_decode_error();
                warn!("dropping realtime frame: {}", e);
            }
        }
    }

    fn spawn_resubscribe(self: &Arc<Self>) {
        let channels: Vec<ChannelName> = self.lock_subscriptions().iter().cloned().collect();
        if channels.is_empty() {
            return;
        }
        info!("restoring {} realtime subscriptions", channels.len());
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            for channel in channels {
                inner.request(&channel, ControlAction::Subscribe).await;
            }
        });
    }

    /// Pumps one open connection until it ends; returns the close code.
    async fn run(self: &Arc<Self>, generation: u64, connection: Connection) -> u16 {
        let Connection {
            mut frames,
            outbound,
            writable,
        } = connection;

        {
            let mut link = self.lock_link();
            if link.generation != generation {
                let _ = outbound.send(Outbound::Close {
                    code: NORMAL_CLOSURE,
                });
                return NORMAL_CLOSURE;
            }
            link.outbound = Some(outbound);
            link.writable = writable;
            link.attempt = 0;
            link.pending_delay = None;
            self.state.send_replace(ConnectionState::Connected);
        }
        self.metrics.record_connection_opened();
        info!("realtime connection open");

        if self.config.resubscribe_on_reconnect {
            self.spawn_resubscribe();
        }

        let code = loop {
            match frames.recv().await {
                Some(Frame::Text(text)) => self.handle_text(&text),
                Some(Frame::Closed { code, reason }) => {
                    debug!("realtime peer closed: {} {}", code, reason);
                    break code;
                }
                None => break ABNORMAL_CLOSURE,
            }
        };

        let mut link = self.lock_link();
        if link.generation == generation {
            link.outbound = None;
            link.writable = false;
        }
        code
    }
}

async fn supervise(inner: Arc<Inner>, generation: u64) {
    loop {
        let Some(token) = inner.tokens.access_token() else {
            info!("access token gone; realtime transport stays disconnected");
            inner.set_state(generation, ConnectionState::Disconnected);
            return;
        };
        if !inner.set_state(generation, ConnectionState::Connecting) {
            return;
        }

        let url = inner.config.connection_url(&token);
        match inner.connector.open(&url).await {
            Ok(connection) => {
                let code = inner.run(generation, connection).await;
                inner.metrics.record_connection_closed();
                if !inner.set_state(generation, ConnectionState::Disconnected) {
                    return;
                }
                if code == NORMAL_CLOSURE {
                    info!("realtime connection closed normally");
                    return;
                }
                warn!("realtime connection closed with code {}", code);
            }
            Err(e) => {
                inner.metrics.record_error();
                warn!("realtime connection attempt failed: {}", e);
                if !inner.set_state(generation, ConnectionState::Disconnected) {
                    return;
                }
            }
        }

        let Some(delay) = inner.schedule_retry(generation) else {
            return;
        };
        tokio::time::sleep(delay).await;
    }
}
