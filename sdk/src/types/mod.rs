//! Core types for the wmsync SDK.
//!
//! This module provides the server-derived entities the console keeps in
//! sync, the authenticated identity, and realtime channel names.

pub mod channel;
pub mod company;
pub mod identity;
pub mod user;
pub mod wms;

pub use channel::{ChannelName, ChannelScope};
pub use company::{Company, Warehouse};
pub use identity::{Identity, Profile, UserType};
pub use user::User;
pub use wms::{Invitation, InvitationStatus, Permission, Role, Wms};
