//! Application-wide access to the realtime transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info};
use wmsync_sdk::realtime::{ConnectionState, InboundEvent, RealtimeTransport};
use wmsync_sdk::types::ChannelName;

/// Thin lifecycle wrapper around one [`RealtimeTransport`].
///
/// Cloning shares the same transport and mount flag. Mounting connects,
/// unmounting tears the transport down; both happen at most once per cycle.
#[derive(Debug, Clone)]
pub struct RealtimeContext {
    transport: RealtimeTransport,
    mounted: Arc<AtomicBool>,
}

impl RealtimeContext {
    /// Wraps a transport. Nothing connects until [`Self::mount`].
    #[must_use]
    pub fn new(transport: RealtimeTransport) -> Self {
        Self {
            transport,
            mounted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub fn transport(&self) -> &RealtimeTransport {
        &self.transport
    }

    /// Mounts the context and connects. Returns false if already mounted.
    pub fn mount(&self) -> bool {
        if self
            .mounted
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("realtime context already mounted");
            return false;
        }
        info!("realtime context mounted");
        self.transport.connect();
        true
    }

    /// Unmounts the context, closing the connection normally.
    pub fn unmount(&self) {
        if self.mounted.swap(false, Ordering::AcqRel) {
            self.transport.teardown();
            info!("realtime context unmounted");
        }
    }

    /// Returns true while mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Connects if mounted, e.g. once a session token is available.
    pub fn connect(&self) -> bool {
        self.is_mounted() && self.transport.connect()
    }

    /// Closes the connection without unmounting, e.g. on logout.
    pub fn disconnect(&self) {
        self.transport.teardown();
    }

    /// Returns true if the transport is connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Watches connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.watch_state()
    }

    /// Returns the most recently decoded event.
    #[must_use]
    pub fn last_event(&self) -> Option<InboundEvent> {
        self.transport.last_event()
    }

    /// Receives every decoded event from now on.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<InboundEvent> {
        self.transport.events()
    }

    /// Subscribes to a channel. Failures are logged by the transport.
    pub async fn subscribe(&self, channel: &ChannelName) -> bool {
        self.transport.subscribe_channel(channel).await
    }

    /// Unsubscribes from a channel. Failures are logged by the transport.
    pub async fn unsubscribe(&self, channel: &ChannelName) -> bool {
        self.transport.unsubscribe_channel(channel).await
    }
}
