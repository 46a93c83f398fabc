//! Capped exponential backoff for reconnects.

use std::time::Duration;

/// Reconnect delay policy: `min(max, base * 2^attempt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    /// Creates a policy with the given base delay and ceiling.
    #[must_use]
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Base delay.
    #[must_use]
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// Delay ceiling.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Delay before the reconnect that follows the `attempt`-th consecutive
    /// failure.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}
