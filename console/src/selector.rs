//! Mounts the entity context matching the logged-in user's type.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use wmsync_sdk::client::ApiLayer;
use wmsync_sdk::types::{Identity, UserType};

use crate::entity::{CompanyScope, MyCompanyContext, MyWmsContext, WmsScope};
use crate::realtime_context::RealtimeContext;

/// Which entity context an identity calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// No identity, or its required foreign key is missing.
    #[default]
    None,
    /// A company user with a company id.
    Company,
    /// A wms user with a wms id.
    Wms,
}

/// Picks the route for an identity.
#[must_use]
pub fn route(identity: Option<&Identity>) -> Route {
    match identity {
        Some(identity) if identity.scope_key().is_some() => match identity.user_type {
            UserType::Company => Route::Company,
            UserType::Wms => Route::Wms,
        },
        _ => Route::None,
    }
}

enum Mounted {
    Company(Arc<MyCompanyContext>, JoinHandle<()>),
    Wms(Arc<MyWmsContext>, JoinHandle<()>),
}

impl Mounted {
    fn route(&self) -> Route {
        match self {
            Self::Company(..) => Route::Company,
            Self::Wms(..) => Route::Wms,
        }
    }

    async fn unmount(self) {
        match self {
            Self::Company(ctx, driver) => {
                driver.abort();
                ctx.unmount().await;
            }
            Self::Wms(ctx, driver) => {
                driver.abort();
                ctx.unmount().await;
            }
        }
    }
}

/// Keeps the mounted entity context in line with the identity.
///
/// Within one route the mounted context follows identity changes itself;
/// the selector only swaps contexts when the route changes.
pub struct EntitySelector {
    api: Arc<dyn ApiLayer>,
    realtime: RealtimeContext,
    identity: watch::Receiver<Option<Identity>>,
    discard_stale: bool,
    mounted: Mutex<Option<Mounted>>,
}

impl std::fmt::Debug for EntitySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySelector")
            .field("route", &self.route())
            .finish_non_exhaustive()
    }
}

impl EntitySelector {
    /// Creates a selector with nothing mounted.
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiLayer>,
        realtime: RealtimeContext,
        identity: watch::Receiver<Option<Identity>>,
        discard_stale: bool,
    ) -> Self {
        Self {
            api,
            realtime,
            identity,
            discard_stale,
            mounted: Mutex::new(None),
        }
    }

    fn lock_mounted(&self) -> MutexGuard<'_, Option<Mounted>> {
        self.mounted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the route currently mounted.
    #[must_use]
    pub fn route(&self) -> Route {
        self.lock_mounted()
            .as_ref()
            .map_or(Route::None, Mounted::route)
    }

    /// Returns the company context, if mounted.
    #[must_use]
    pub fn company(&self) -> Option<Arc<MyCompanyContext>> {
        match self.lock_mounted().as_ref() {
            Some(Mounted::Company(ctx, _)) => Some(Arc::clone(ctx)),
            _ => None,
        }
    }

    /// Returns the wms context, if mounted.
    #[must_use]
    pub fn wms(&self) -> Option<Arc<MyWmsContext>> {
        match self.lock_mounted().as_ref() {
            Some(Mounted::Wms(ctx, _)) => Some(Arc::clone(ctx)),
            _ => None,
        }
    }

    /// Mounts the context the current identity calls for, unmounting the
    /// previous one if the route changed. Returns the route.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn refresh(&self) -> Route {
        let identity = self.identity.borrow().clone();
        let next = route(identity.as_ref());

        let previous = {
            let mut mounted = self.lock_mounted();
            if mounted.as_ref().map_or(Route::None, Mounted::route) == next {
                return next;
            }
            let previous = mounted.take();
            *mounted = self.mount(next);
            previous
        };

        if let Some(previous) = previous {
            debug!("unmounting {:?} context", previous.route());
            previous.unmount().await;
        }
        info!("entity route is {:?}", next);
        next
    }

    fn mount(&self, route: Route) -> Option<Mounted> {
        match route {
            Route::None => None,
            Route::Company => {
                let ctx = Arc::new(MyCompanyContext::new(
                    CompanyScope::new(Arc::clone(&self.api), self.discard_stale),
                    self.realtime.clone(),
                ));
                let driver = ctx.spawn(self.identity.clone());
                Some(Mounted::Company(ctx, driver))
            }
            Route::Wms => {
                let ctx = Arc::new(MyWmsContext::new(
                    WmsScope::new(Arc::clone(&self.api), self.discard_stale),
                    self.realtime.clone(),
                ));
                let driver = ctx.spawn(self.identity.clone());
                Some(Mounted::Wms(ctx, driver))
            }
        }
    }

    /// Spawns the driver: refreshes on every identity change.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let selector = Arc::clone(self);
        let mut identity = self.identity.clone();

        tokio::spawn(async move {
            loop {
                identity.mark_unchanged();
                selector.refresh().await;
                if identity.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Unmounts whatever is mounted.
    pub async fn unmount(&self) {
        let previous = self.lock_mounted().take();
        if let Some(previous) = previous {
            previous.unmount().await;
        }
    }
}
