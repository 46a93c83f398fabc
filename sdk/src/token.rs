//! Access and refresh token storage.
//!
//! The store is pure storage; refreshing tokens is the API layer's concern.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// A token pair with the access token's expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    /// Bearer token for API calls and realtime handshakes.
    pub access_token: String,

    /// Token used to obtain a new access token.
    pub refresh_token: Option<String>,

    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Tokens {
    /// Creates a token pair with only an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns true if the access token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Holds the current session's tokens.
pub trait TokenStore: Send + Sync {
    /// Returns the current tokens, if logged in.
    fn tokens(&self) -> Option<Tokens>;

    /// Replaces the stored tokens.
    fn set_tokens(&self, tokens: Tokens);

    /// Forgets the stored tokens.
    fn clear(&self);

    /// Returns the current access token, if any.
    fn access_token(&self) -> Option<String> {
        self.tokens().map(|t| t.access_token)
    }
}

/// In-memory token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<Tokens>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given tokens.
    #[must_use]
    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn tokens(&self) -> Option<Tokens> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_tokens(&self, tokens: Tokens) {
        *self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(tokens);
    }

    fn clear(&self) {
        *self
            .tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
