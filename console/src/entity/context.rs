//! The pattern shared by entity contexts.
//!
//! An [`EntityContext`] owns the slices of one [`EntityScope`], keyed by an
//! id taken from the identity (company id, wms id). When the id appears or
//! changes, every slice is cleared and fetched in parallel and the channel
//! `<scope>:<id>` is bound. When it disappears, slices are cleared and the
//! channel released. Events on the bound channel are looked up in the
//! scope's closed event table and refetch exactly the slices it names.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wmsync_sdk::realtime::InboundEvent;
use wmsync_sdk::types::{ChannelName, ChannelScope, Identity};

use super::binding::ChannelBinding;
use super::slice::{FetchKey, ScopeTracker};
use crate::realtime_context::RealtimeContext;

/// An event name a context reacts to.
pub trait ScopedEvent: Copy + Debug + Send + Sync + 'static {
    /// Slice identifier of the owning context.
    type Slice: Copy + Debug + Eq + Send + Sync + 'static;

    /// Parses a wire event name; unknown names yield `None`.
    fn from_name(name: &str) -> Option<Self>;

    /// The wire event name.
    fn name(self) -> &'static str;

    /// The slices this event invalidates.
    fn refetches(self) -> &'static [Self::Slice];
}

/// The slices, fetches and event table of one kind of entity context.
#[async_trait]
pub trait EntityScope: Send + Sync + 'static {
    /// Slice identifier.
    type Slice: Copy + Debug + Eq + Send + Sync + 'static;

    /// Events this scope reacts to.
    type Event: ScopedEvent<Slice = Self::Slice>;

    /// Name used in logs.
    const NAME: &'static str;

    /// Channel scope of the bound channel.
    const CHANNEL_SCOPE: ChannelScope;

    /// Every slice, in fetch order.
    const SLICES: &'static [Self::Slice];

    /// The id this scope is keyed by, if the identity carries it.
    fn scope_id(identity: &Identity) -> Option<&str>;

    /// Fetches one slice for `id`.
    async fn refetch(&self, slice: Self::Slice, id: &str, key: &FetchKey);

    /// Nulls every slice.
    fn clear(&self);
}

/// A pending scope change produced by [`EntityContext::rescope`].
#[derive(Debug)]
struct Rescope {
    id: Option<String>,
    key: FetchKey,
}

/// Entity context generic over its scope.
pub struct EntityContext<S: EntityScope> {
    scope: S,
    realtime: RealtimeContext,
    binding: ChannelBinding,
    tracker: ScopeTracker,
    current: Mutex<Option<String>>,
    mounted: AtomicBool,
}

impl<S: EntityScope> std::fmt::Debug for EntityContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityContext")
            .field("name", &S::NAME)
            .field("scope_id", &self.scope_id())
            .field("mounted", &self.is_mounted())
            .finish_non_exhaustive()
    }
}

impl<S: EntityScope> EntityContext<S> {
    /// Creates a mounted context with no identity.
    #[must_use]
    pub fn new(scope: S, realtime: RealtimeContext) -> Self {
        Self {
            scope,
            binding: ChannelBinding::new(realtime.clone()),
            realtime,
            tracker: ScopeTracker::new(),
            current: Mutex::new(None),
            mounted: AtomicBool::new(true),
        }
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<String>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the scope holding the slices.
    #[must_use]
    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// Returns the id the context is currently keyed by.
    #[must_use]
    pub fn scope_id(&self) -> Option<String> {
        self.lock_current().clone()
    }

    /// Returns the context's own channel, if it has an id.
    #[must_use]
    pub fn channel(&self) -> Option<ChannelName> {
        self.scope_id()
            .map(|id| ChannelName::new(S::CHANNEL_SCOPE, id))
    }

    /// The current id together with a fetch key for it.
    fn current_scope(&self) -> Option<(String, FetchKey)> {
        let current = self.lock_current();
        current.clone().map(|id| (id, self.tracker.key()))
    }

    /// Returns the channel currently subscribed.
    pub async fn bound_channel(&self) -> Option<ChannelName> {
        self.binding.bound().await
    }

    /// Returns true until [`Self::unmount`].
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Applies an identity and waits for the resulting fetches.
    ///
    /// Does nothing if the scope id did not change.
    pub async fn set_identity(&self, identity: Option<&Identity>) {
        if let Some(change) = self.rescope(identity) {
            self.apply(change).await;
        }
    }

    /// Records the new scope id, clears the slices and invalidates fetches
    /// from the previous scope.
    fn rescope(&self, identity: Option<&Identity>) -> Option<Rescope> {
        if !self.is_mounted() {
            return None;
        }
        let next = identity.and_then(S::scope_id).map(str::to_owned);
        let key = {
            let mut current = self.lock_current();
            if *current == next {
                return None;
            }
            *current = next.clone();
            self.tracker.advance()
        };

        self.scope.clear();
        self.binding
            .want(next.as_ref().map(|id| ChannelName::new(S::CHANNEL_SCOPE, id)));
        match &next {
            Some(id) => info!("{} context scoped to {}", S::NAME, id),
            None => info!("{} context cleared", S::NAME),
        }
        Some(Rescope { id: next, key })
    }

    /// Binds the channel and runs the initial fetch of every slice.
    async fn apply(&self, change: Rescope) {
        let fetch_all = async {
            if let Some(id) = &change.id {
                join_all(
                    S::SLICES
                        .iter()
                        .map(|slice| self.scope.refetch(*slice, id, &change.key)),
                )
                .await;
            }
        };
        tokio::join!(self.binding.reconcile(), fetch_all);
    }

    /// Refetches the slices an event names, if it is on this context's
    /// channel. Returns the slices refetched.
    pub async fn handle_event(&self, event: &InboundEvent) -> &'static [S::Slice] {
        let Some((id, key)) = self.current_scope() else {
            return &[];
        };
        if !event.is_on(&ChannelName::new(S::CHANNEL_SCOPE, id.as_str())) {
            return &[];
        }
        let Some(parsed) = S::Event::from_name(&event.event) else {
            debug!("{} context ignores {}", S::NAME, event.event);
            return &[];
        };

        let slices = parsed.refetches();
        debug!("{} on {} refetches {:?}", parsed.name(), event.channel, slices);
        join_all(
            slices
                .iter()
                .map(|slice| self.scope.refetch(*slice, &id, &key)),
        )
        .await;
        slices
    }

    /// Refetches every slice of the current scope. Used when realtime
    /// events were missed and it is unknown which slices they touched.
    pub async fn refresh_all(&self) -> &'static [S::Slice] {
        let Some((id, key)) = self.current_scope() else {
            return &[];
        };
        join_all(
            S::SLICES
                .iter()
                .map(|slice| self.scope.refetch(*slice, &id, &key)),
        )
        .await;
        S::SLICES
    }

    /// Reacts to a connection state change.
    pub async fn on_connection(&self, connected: bool) {
        if connected {
            self.binding.reconcile().await;
        }
    }

    /// Releases the channel, clears the slices and ignores anything still
    /// in flight.
    pub async fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::AcqRel) {
            return;
        }
        {
            let mut current = self.lock_current();
            *current = None;
            self.tracker.advance();
        }
        self.scope.clear();
        self.binding.release().await;
        info!("{} context unmounted", S::NAME);
    }

    /// Spawns the driver: follows `identity`, the connection state and the
    /// event stream until unmounted.
    pub fn spawn(self: &Arc<Self>, mut identity: watch::Receiver<Option<Identity>>) -> JoinHandle<()> {
        let ctx = Arc::clone(self);
        let mut state = ctx.realtime.watch_state();
        let mut events = ctx.realtime.events();

        tokio::spawn(async move {
            let initial = identity.borrow_and_update().clone();
            ctx.spawn_rescope(initial.as_ref());

            while ctx.is_mounted() {
                tokio::select! {
                    changed = identity.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let next = identity.borrow_and_update().clone();
                        ctx.spawn_rescope(next.as_ref());
                    }
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = state.borrow_and_update().is_connected();
                        if connected {
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move { ctx.on_connection(true).await });
                        }
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move {
                                ctx.handle_event(&event).await;
                            });
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(
                                "{} context missed {} realtime events, refreshing every slice",
                                S::NAME, missed
                            );
                            let ctx = Arc::clone(&ctx);
                            tokio::spawn(async move {
                                ctx.refresh_all().await;
                            });
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!("{} context driver stopped", S::NAME);
        })
    }

    fn spawn_rescope(self: &Arc<Self>, identity: Option<&Identity>) {
        if let Some(change) = self.rescope(identity) {
            let ctx = Arc::clone(self);
            tokio::spawn(async move { ctx.apply(change).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wmsync_sdk::realtime::{ChannelStrategy, MemoryConnector, RealtimeConfig, RealtimeTransport};
    use wmsync_sdk::token::MemoryTokenStore;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Part {
        Head,
        Tail,
    }

    #[derive(Debug, Clone, Copy)]
    enum Touched {
        Head,
    }

    impl ScopedEvent for Touched {
        type Slice = Part;

        fn from_name(name: &str) -> Option<Self> {
            (name == "HeadTouched").then_some(Self::Head)
        }

        fn name(self) -> &'static str {
            "HeadTouched"
        }

        fn refetches(self) -> &'static [Part] {
            &[Part::Head]
        }
    }

    /// Records every refetch with its id and whether its key was current.
    #[derive(Debug, Default)]
    struct Recording {
        fetches: Mutex<Vec<(Part, String, bool)>>,
    }

    #[async_trait]
    impl EntityScope for Recording {
        type Slice = Part;
        type Event = Touched;

        const NAME: &'static str = "recording";
        const CHANNEL_SCOPE: ChannelScope = ChannelScope::Company;
        const SLICES: &'static [Part] = &[Part::Head, Part::Tail];

        fn scope_id(identity: &Identity) -> Option<&str> {
            identity.company_id.as_deref()
        }

        async fn refetch(&self, slice: Part, id: &str, key: &FetchKey) {
            self.fetches
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((slice, id.to_string(), key.is_current()));
        }

        fn clear(&self) {}
    }

    fn context() -> EntityContext<Recording> {
        let (connector, _listener) = MemoryConnector::new();
        let transport = RealtimeTransport::new(
            RealtimeConfig::socket("wss://rt.example.com"),
            Arc::new(MemoryTokenStore::new()),
            Arc::new(connector),
            ChannelStrategy::InBand,
        )
        .expect("transport");
        EntityContext::new(Recording::default(), RealtimeContext::new(transport))
    }

    fn fetches(ctx: &EntityContext<Recording>) -> Vec<(Part, String, bool)> {
        ctx.scope()
            .fetches
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    #[tokio::test]
    async fn test_scope_key_taken_before_switch_is_stale() {
        let ctx = context();
        ctx.rescope(Some(&Identity::company("u1", "c1")));

        let (id, key) = ctx.current_scope().expect("scoped");
        ctx.rescope(Some(&Identity::company("u1", "c2")));

        assert_eq!(id, "c1");
        assert!(!key.is_current());
        let (id, key) = ctx.current_scope().expect("scoped");
        assert_eq!(id, "c2");
        assert!(key.is_current());
    }

    #[tokio::test]
    async fn test_unmount_invalidates_scope_key() {
        let ctx = context();
        ctx.rescope(Some(&Identity::company("u1", "c1")));
        let (_, key) = ctx.current_scope().expect("scoped");

        ctx.unmount().await;

        assert!(!key.is_current());
        assert!(ctx.current_scope().is_none());
    }

    #[tokio::test]
    async fn test_event_refetches_with_current_key() {
        let ctx = context();
        ctx.rescope(Some(&Identity::company("u1", "c1")));

        let refetched = ctx
            .handle_event(&InboundEvent::new("HeadTouched", "company:c1"))
            .await;

        assert_eq!(refetched, &[Part::Head]);
        assert_eq!(fetches(&ctx), vec![(Part::Head, "c1".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_refresh_all_refetches_every_slice() {
        let ctx = context();
        assert!(ctx.refresh_all().await.is_empty());

        ctx.rescope(Some(&Identity::company("u1", "c1")));
        let refetched = ctx.refresh_all().await;

        assert_eq!(refetched, &[Part::Head, Part::Tail]);
        assert_eq!(
            fetches(&ctx),
            vec![
                (Part::Head, "c1".to_string(), true),
                (Part::Tail, "c1".to_string(), true),
            ]
        );
    }
}
