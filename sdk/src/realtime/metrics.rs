//! Realtime transport metrics.
//!
//! Provides atomic counters for monitoring the push connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Metrics for one realtime transport.
#[derive(Debug)]
pub struct TransportMetrics {
    /// Connections successfully opened.
    connections_opened: AtomicU64,

    /// Connections that ended, for any reason.
    connections_closed: AtomicU64,

    /// Inbound frames received.
    frames_received: AtomicU64,

    /// Inbound frames dropped as malformed.
    decode_errors: AtomicU64,

    /// Reconnects scheduled after failures.
    reconnects_scheduled: AtomicU64,

    /// Subscribe requests issued.
    subscriptions: AtomicU64,

    /// Unsubscribe requests issued.
    unsubscriptions: AtomicU64,

    /// Failed opens, sends and control requests.
    errors: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            reconnects_scheduled: AtomicU64::new(0),
            subscriptions: AtomicU64::new(0),
            unsubscriptions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a connection opened.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a connection closed.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound frame.
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a malformed inbound frame.
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a scheduled reconnect.
    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subscribe request.
    pub fn record_subscription(&self) {
        self.subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an unsubscribe request.
    pub fn record_unsubscription(&self) {
        self.unsubscriptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the connections opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    /// Returns the connections closed.
    #[must_use]
    pub fn connections_closed(&self) -> u64 {
        self.connections_closed.load(Ordering::Relaxed)
    }

    /// Returns the frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns the malformed frames dropped.
    #[must_use]
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Returns the reconnects scheduled.
    #[must_use]
    pub fn reconnects_scheduled(&self) -> u64 {
        self.reconnects_scheduled.load(Ordering::Relaxed)
    }

    /// Returns the subscribe requests issued.
    #[must_use]
    pub fn subscriptions(&self) -> u64 {
        self.subscriptions.load(Ordering::Relaxed)
    }

    /// Returns the unsubscribe requests issued.
    #[must_use]
    pub fn unsubscriptions(&self) -> u64 {
        self.unsubscriptions.load(Ordering::Relaxed)
    }

    /// Returns the errors.
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            connections_opened: self.connections_opened(),
            connections_closed: self.connections_closed(),
            frames_received: self.frames_received(),
            decode_errors: self.decode_errors(),
            reconnects_scheduled: self.reconnects_scheduled(),
            subscriptions: self.subscriptions(),
            unsubscriptions: self.unsubscriptions(),
            errors: self.errors(),
            uptime: self.uptime(),
        }
    }
}

/// A point-in-time snapshot of transport metrics.
#[derive(Debug, Clone)]
pub struct TransportMetricsSnapshot {
    /// Connections opened.
    pub connections_opened: u64,
    /// Connections closed.
    pub connections_closed: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Malformed frames dropped.
    pub decode_errors: u64,
    /// Reconnects scheduled.
    pub reconnects_scheduled: u64,
    /// Subscribe requests.
    pub subscriptions: u64,
    /// Unsubscribe requests.
    pub unsubscriptions: u64,
    /// Errors.
    pub errors: u64,
    /// Uptime.
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = TransportMetrics::new();
        assert_eq!(metrics.connections_opened(), 0);
        assert_eq!(metrics.decode_errors(), 0);
    }

    #[test]
    fn test_metrics_record() {
        let metrics = TransportMetrics::default();
        metrics.record_connection_opened();
        metrics.record_frame();
        metrics.record_frame();
        metrics.record_decode_error();
        metrics.record_reconnect_scheduled();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_opened, 1);
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.reconnects_scheduled, 1);
    }
}
