//! Realtime transport: one authenticated push connection per session.
//!
//! The transport connects with the session's access token, decodes inbound
//! frames into [`InboundEvent`]s, republishes them to any number of
//! listeners and reconnects with capped exponential backoff after abnormal
//! closes. Two wire variants are provided: a bidirectional socket
//! ([`SocketConnector`]) and a server-sent event stream
//! ([`StreamConnector`]) whose subscriptions go through the API layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wmsync_sdk::client::{ClientConfig, WmsClient};
//! use wmsync_sdk::realtime::{RealtimeConfig, RealtimeTransport};
//! use wmsync_sdk::token::{MemoryTokenStore, Tokens};
//! use wmsync_sdk::types::ChannelName;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = Arc::new(MemoryTokenStore::with_tokens(Tokens::new("secret")));
//!     let api = Arc::new(WmsClient::new(ClientConfig::default(), tokens.clone())?);
//!     let transport = RealtimeTransport::from_config(
//!         RealtimeConfig::socket("wss://realtime.wms.example"),
//!         tokens,
//!         api,
//!     )?;
//!
//!     let mut events = transport.events();
//!     transport.connect();
//!     transport.subscribe_channel(&ChannelName::company("c1")).await;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{} on {}", event.event, event.channel);
//!     }
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod config;
pub mod connection;
pub mod error;
pub mod memory;
pub mod messages;
pub mod metrics;
pub mod socket;
pub mod strategy;
pub mod stream;
pub mod transport;

pub use backoff::Backoff;
pub use config::{RealtimeConfig, TransportVariant};
pub use connection::{
    Connection, ConnectionState, Connector, Frame, Outbound, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};
pub use error::RealtimeError;
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use messages::{decode_frame, ControlAction, ControlMessage, InboundEvent};
pub use metrics::{TransportMetrics, TransportMetricsSnapshot};
pub use socket::SocketConnector;
pub use strategy::ChannelStrategy;
pub use stream::{SseDecoder, StreamConnector};
pub use transport::RealtimeTransport;
