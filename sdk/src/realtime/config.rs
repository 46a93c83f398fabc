//! Realtime transport configuration.
//!
//! Provides configuration options for the persistent push connection.

use std::time::Duration;

use super::error::RealtimeError;

/// Default realtime base URL.
pub const DEFAULT_REALTIME_URL: &str = "wss://realtime.wms.example";

/// Default path of the socket endpoint.
pub const DEFAULT_SOCKET_PATH: &str = "/ws";

/// Default path of the event-stream endpoint.
pub const DEFAULT_STREAM_PATH: &str = "/events";

/// Default base reconnect delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default reconnect delay ceiling in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Default capacity of the event broadcast buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Which underlying push protocol to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportVariant {
    /// Bidirectional socket; subscriptions travel in-band.
    Socket,
    /// Read-only event stream; subscriptions go through the API layer.
    Stream,
}

impl std::str::FromStr for TransportVariant {
    type Err = RealtimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" | "ws" => Ok(Self::Socket),
            "stream" | "sse" => Ok(Self::Stream),
            other => Err(RealtimeError::InvalidConfig(format!(
                "unknown transport variant: {}",
                other
            ))),
        }
    }
}

/// Realtime configuration.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Base URL (`ws(s)://` for sockets, `http(s)://` for streams).
    pub base_url: String,

    /// Path of the socket endpoint.
    pub socket_path: String,

    /// Path of the event-stream endpoint.
    pub stream_path: String,

    /// Push protocol.
    pub variant: TransportVariant,

    /// Base reconnect delay, doubled per consecutive failure.
    pub base_delay: Duration,

    /// Reconnect delay ceiling.
    pub max_delay: Duration,

    /// Maximum consecutive reconnect attempts (None = unlimited).
    pub max_reconnect_attempts: Option<u32>,

    /// Replay desired subscriptions after every successful (re)connect.
    pub resubscribe_on_reconnect: bool,

    /// Capacity of the event broadcast buffer.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REALTIME_URL.to_string(),
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            variant: TransportVariant::Socket,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            max_reconnect_attempts: None,
            resubscribe_on_reconnect: false,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl RealtimeConfig {
    /// Creates a socket configuration with the given base URL.
    #[must_use]
    pub fn socket(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            variant: TransportVariant::Socket,
            ..Default::default()
        }
    }

    /// Creates an event-stream configuration with the given base URL.
    #[must_use]
    pub fn stream(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            variant: TransportVariant::Stream,
            ..Default::default()
        }
    }

    /// Sets the reconnect backoff bounds.
    #[must_use]
    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Sets the maximum reconnection attempts.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Enables or disables replaying subscriptions after reconnect.
    #[must_use]
    pub fn with_resubscribe_on_reconnect(mut self, enabled: bool) -> Self {
        self.resubscribe_on_reconnect = enabled;
        self
    }

    /// Sets the event broadcast buffer size.
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Returns the endpoint path for the configured variant.
    #[must_use]
    pub fn path(&self) -> &str {
        match self.variant {
            TransportVariant::Socket => &self.socket_path,
            TransportVariant::Stream => &self.stream_path,
        }
    }

    /// Returns the connection URL carrying the access token.
    ///
    /// The token travels as a query parameter because neither protocol lets
    /// the client set headers on the handshake.
    #[must_use]
    pub fn connection_url(&self, token: &str) -> String {
        let base = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path().trim_start_matches('/')
        );
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", base, separator, urlencoding::encode(token))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), RealtimeError> {
        if self.base_url.is_empty() {
            return Err(RealtimeError::InvalidConfig(
                "base_url cannot be empty".to_string(),
            ));
        }

        let schemes: &[&str] = match self.variant {
            TransportVariant::Socket => &["ws://", "wss://"],
            TransportVariant::Stream => &["http://", "https://"],
        };
        if !schemes.iter().any(|s| self.base_url.starts_with(s)) {
            return Err(RealtimeError::InvalidConfig(format!(
                "base_url must start with {}",
                schemes.join(" or ")
            )));
        }

        if self.base_delay.is_zero() {
            return Err(RealtimeError::InvalidConfig(
                "base_delay must be positive".to_string(),
            ));
        }

        if self.max_delay < self.base_delay {
            return Err(RealtimeError::InvalidConfig(
                "max_delay must be at least base_delay".to_string(),
            ));
        }

        if self.event_buffer == 0 {
            return Err(RealtimeError::InvalidConfig(
                "event_buffer must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
