//! Wmsync Console - realtime synchronization core for the WMS console.
//!
//! This crate keeps server-derived entities in sync with the backend: one
//! realtime connection per session, entity contexts that fetch their
//! slices when the identity appears and refetch exactly the slices an
//! incoming event invalidates.
//!
//! # Components
//!
//! - [`config`]: Service configuration
//! - [`realtime_context`]: Lifecycle wrapper around the transport
//! - [`entity`]: Slices, channel bindings and the entity contexts
//! - [`selector`]: Mounts the context matching the user's type
//! - [`app`]: Composition root

pub mod app;
pub mod config;
pub mod entity;
pub mod realtime_context;
pub mod selector;

pub use app::SyncApp;
pub use config::{ConfigError, SyncConfig};
pub use entity::{MeContext, MyCompanyContext, MyWmsContext, Slice, SliceState};
pub use realtime_context::RealtimeContext;
pub use selector::{route, EntitySelector, Route};
