//! Keeps one channel subscription in line with what a context wants.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;
use wmsync_sdk::types::ChannelName;

use crate::realtime_context::RealtimeContext;

/// Tracks the channel a context wants and the one it is subscribed to.
///
/// [`Self::want`] records intent synchronously; [`Self::reconcile`] then
/// unsubscribes the old channel and subscribes the new one once connected.
/// Reconciles are serialized, so a channel is never subscribed twice while
/// the record says it is bound. The record survives disconnects; whether a
/// reconnect restores the server side is up to the transport.
#[derive(Debug)]
pub struct ChannelBinding {
    realtime: RealtimeContext,
    wanted: Mutex<Option<ChannelName>>,
    bound: tokio::sync::Mutex<Option<ChannelName>>,
}

impl ChannelBinding {
    /// Creates an unbound binding.
    #[must_use]
    pub fn new(realtime: RealtimeContext) -> Self {
        Self {
            realtime,
            wanted: Mutex::new(None),
            bound: tokio::sync::Mutex::new(None),
        }
    }

    fn lock_wanted(&self) -> MutexGuard<'_, Option<ChannelName>> {
        self.wanted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the channel that should be subscribed, or none.
    pub fn want(&self, channel: Option<ChannelName>) {
        *self.lock_wanted() = channel;
    }

    /// Returns the channel that should be subscribed.
    #[must_use]
    pub fn wanted(&self) -> Option<ChannelName> {
        self.lock_wanted().clone()
    }

    /// Returns the channel currently subscribed.
    pub async fn bound(&self) -> Option<ChannelName> {
        self.bound.lock().await.clone()
    }

    /// Brings the subscription in line with the wanted channel.
    pub async fn reconcile(&self) {
        let mut bound = self.bound.lock().await;
        let wanted = self.wanted();

        if let Some(current) = bound.as_ref() {
            if wanted.as_ref() == Some(current) {
                return;
            }
            self.realtime.unsubscribe(current).await;
            *bound = None;
        }

        let Some(channel) = wanted else {
            return;
        };
        if !self.realtime.connected() {
            debug!("{} waits for the realtime connection", channel);
            return;
        }
        if self.realtime.subscribe(&channel).await {
            *bound = Some(channel);
        }
    }

    /// Drops the wanted channel and unsubscribes.
    pub async fn release(&self) {
        self.want(None);
        self.reconcile().await;
    }
}
