//! Realtime error types.
//!
//! Provides error types for realtime transport operations.

use std::fmt;

/// Realtime transport errors.
#[derive(Debug)]
pub enum RealtimeError {
    /// Connection failed.
    Connection(String),

    /// Protocol error on an established connection.
    Protocol(String),

    /// Failed to serialize an outbound message.
    Serialization(String),

    /// Failed to decode an inbound frame.
    Decode(String),

    /// Not connected.
    NotConnected,

    /// Connection closed.
    Closed,

    /// No access token is available.
    MissingToken,

    /// Subscription request failed.
    SubscriptionFailed(String),

    /// Invalid configuration.
    InvalidConfig(String),

    /// Send failed.
    SendFailed(String),
}

impl fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection failed: {}", msg),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::Decode(msg) => write!(f, "malformed frame: {}", msg),
            Self::NotConnected => write!(f, "not connected"),
            Self::Closed => write!(f, "connection closed"),
            Self::MissingToken => write!(f, "no access token"),
            Self::SubscriptionFailed(msg) => write!(f, "subscription failed: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
        }
    }
}

impl std::error::Error for RealtimeError {}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}
