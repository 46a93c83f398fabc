//! Entity contexts: server-derived state kept fresh by realtime events.
//!
//! - [`MeContext`]: the logged-in user's profile and identity
//! - [`MyCompanyContext`]: company, warehouses and users of a company user
//! - [`MyWmsContext`]: tenant, roles, users, permissions and invitations of
//!   a wms user
//!
//! The company and wms contexts share [`EntityContext`], parameterised by
//! their [`EntityScope`].

pub mod binding;
pub mod company;
pub mod context;
pub mod me;
pub mod slice;
pub mod wms;

pub use binding::ChannelBinding;
pub use company::{CompanyEvent, CompanyScope, CompanySlice, MyCompanyContext};
pub use context::{EntityContext, EntityScope, ScopedEvent};
pub use me::{MeContext, MeEvent, MeSlice};
pub use slice::{FetchKey, ScopeTracker, Slice, SliceState};
pub use wms::{MyWmsContext, WmsEvent, WmsScope, WmsSlice};
