//! Wmsync SDK - Rust client library for the WMS console backend.
//!
//! This crate provides the domain types, the request/response API layer and
//! the realtime push transport that the console's sync core builds on.
//!
//! # Domain Types
//!
//! - [`Profile`], [`Identity`], [`UserType`] - The logged-in user
//! - [`Company`], [`Warehouse`] - Company tenant data
//! - [`Wms`], [`Role`], [`Permission`], [`Invitation`] - WMS tenant data
//! - [`User`] - A member of a company or WMS
//! - [`ChannelName`] - A `scope:id` realtime channel
//!
//! # Layers
//!
//! - [`client`] - [`ApiLayer`] and its HTTP implementation [`WmsClient`]
//! - [`realtime`] - [`RealtimeTransport`] and its connectors
//! - [`token`] - Session credentials via [`TokenStore`]
//!
//! # Example
//!
//! ```rust
//! use wmsync_sdk::{ChannelName, Identity};
//!
//! let identity = Identity::company("u1", "c1");
//! assert_eq!(identity.user_channel(), ChannelName::user("u1"));
//! ```

pub mod client;
pub mod error;
pub mod realtime;
pub mod token;
pub mod types;

pub use client::{ApiLayer, ClientConfig, ClientError, WmsClient};
pub use error::SdkError;
pub use realtime::{
    ChannelStrategy, ConnectionState, InboundEvent, RealtimeConfig, RealtimeError,
    RealtimeTransport, TransportVariant,
};
pub use token::{MemoryTokenStore, TokenStore, Tokens};
pub use types::{
    ChannelName, ChannelScope, Company, Identity, Invitation, InvitationStatus, Permission,
    Profile, Role, User, UserType, Warehouse, Wms,
};
