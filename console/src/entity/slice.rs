//! A single piece of fetched server state.
//!
//! A [`Slice`] publishes its [`SliceState`] on a watch channel. Every load
//! raises `loading`, calls the API layer and then either replaces the value
//! or nulls it and records the error message. Results are dropped when the
//! owning context has moved to another scope since the load began
//! ([`FetchKey`]), or, if stale discarding is on, when a newer load for the
//! same slice has started.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use wmsync_sdk::client::ClientError;

/// Observable state of a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceState<T> {
    /// Fetched value; `None` until loaded, after a failure, or without scope.
    pub value: Option<T>,
    /// True while any load is in flight.
    pub loading: bool,
    /// Message of the last failed load, cleared by the next load.
    pub error: Option<String>,
}

impl<T> Default for SliceState<T> {
    fn default() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
        }
    }
}

/// Hands out [`FetchKey`]s and invalidates them on scope changes.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    epoch: Arc<AtomicU64>,
}

/// Identifies the scope a fetch was started in.
#[derive(Debug, Clone)]
pub struct FetchKey {
    epoch: Arc<AtomicU64>,
    issued: u64,
}

impl ScopeTracker {
    /// Creates a tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A key for the current scope.
    #[must_use]
    pub fn key(&self) -> FetchKey {
        FetchKey {
            epoch: Arc::clone(&self.epoch),
            issued: self.epoch.load(Ordering::Acquire),
        }
    }

    /// Invalidates every outstanding key and returns one for the new scope.
    pub fn advance(&self) -> FetchKey {
        let issued = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        FetchKey {
            epoch: Arc::clone(&self.epoch),
            issued,
        }
    }
}

impl FetchKey {
    /// Returns true if the scope has not changed since the key was issued.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::Acquire) == self.issued
    }
}

/// One named slice of server-derived state.
#[derive(Debug)]
pub struct Slice<T> {
    name: &'static str,
    state: watch::Sender<SliceState<T>>,
    latest_request: AtomicU64,
    in_flight: AtomicUsize,
    discard_stale: bool,
}

/// Lowers `loading` once the last in-flight load ends, however it ends.
struct LoadingRelease<'a, T> {
    slice: &'a Slice<T>,
}

impl<T> Drop for LoadingRelease<'_, T> {
    fn drop(&mut self) {
        if self.slice.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.slice.state.send_if_modified(|state| {
                let was_loading = state.loading;
                state.loading = false;
                was_loading
            });
        }
    }
}

impl<T: Clone> Slice<T> {
    /// Creates an empty slice.
    #[must_use]
    pub fn new(name: &'static str, discard_stale: bool) -> Self {
        let (state, _) = watch::channel(SliceState::default());
        Self {
            name,
            state,
            latest_request: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            discard_stale,
        }
    }

    /// Returns the slice name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn get(&self) -> SliceState<T> {
        self.state.borrow().clone()
    }

    /// Returns the current value.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// Returns true while a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Returns the last error message.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Watches state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SliceState<T>> {
        self.state.subscribe()
    }

    /// Nulls the value and clears the error.
    pub fn clear(&self) {
        self.latest_request.fetch_add(1, Ordering::AcqRel);
        self.state.send_if_modified(|state| {
            let changed = state.value.is_some() || state.error.is_some();
            state.value = None;
            state.error = None;
            changed
        });
    }

    /// Runs `fetch` and stores its outcome.
    ///
    /// Returns true if the outcome was applied, false if it was discarded.
    pub async fn load<F>(&self, key: &FetchKey, fetch: F) -> bool
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let request = self.latest_request.fetch_add(1, Ordering::AcqRel) + 1;
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let _release = LoadingRelease { slice: self };
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = fetch.await;

        if !key.is_current() {
            debug!("discarding {} result from a previous scope", self.name);
            return false;
        }
        if self.discard_stale && self.latest_request.load(Ordering::Acquire) != request {
            debug!("discarding stale {} result", self.name);
            return false;
        }

        match result {
            Ok(value) => self.state.send_modify(|state| {
                state.value = Some(value);
                state.error = None;
            }),
            Err(e) => {
                warn!("fetching {} failed: {}", self.name, e);
                self.state.send_modify(|state| {
                    state.value = None;
                    state.error = Some(e.message());
                });
            }
        }
        true
    }
}
