//! The connector seam between the transport state machine and the
//! underlying push protocol.
//!
//! A [`Connector`] opens one [`Connection`]: a stream of inbound [`Frame`]s
//! plus a sender for [`Outbound`] frames. Protocol IO runs in tasks owned by
//! the connector; the transport only sees channels.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::RealtimeError;

/// Close code for a deliberate, owner-initiated shutdown.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when a connection drops without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none being attempted right now.
    #[default]
    Disconnected,
    /// An open attempt is in flight.
    Connecting,
    /// The connection is open.
    Connected,
}

impl ConnectionState {
    /// Returns true if connected.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// An inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text payload.
    Text(String),
    /// The peer closed the connection.
    Closed {
        /// Close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// An outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text payload.
    Text(String),
    /// Close the connection with the given code.
    Close {
        /// Close code.
        code: u16,
    },
}

/// One open connection.
#[derive(Debug)]
pub struct Connection {
    /// Inbound frames; the channel ending means the connection dropped.
    pub frames: mpsc::UnboundedReceiver<Frame>,

    /// Outbound frames.
    pub outbound: mpsc::UnboundedSender<Outbound>,

    /// False for push-only protocols that ignore outbound text.
    pub writable: bool,
}

/// Opens connections for the transport.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection to `url`, resolving once it is established.
    async fn open(&self, url: &str) -> Result<Connection, RealtimeError>;
}
