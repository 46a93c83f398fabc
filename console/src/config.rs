//! Sync service configuration.
//!
//! Combines the API client and realtime transport settings with the
//! console's own fetch policy, and reads overrides from the environment.

use std::env;
use std::time::Duration;

use wmsync_sdk::client::ClientConfig;
use wmsync_sdk::realtime::{RealtimeConfig, TransportVariant};

/// Environment variable naming the API base URL.
pub const ENV_API_URL: &str = "WMSYNC_API_URL";
/// Environment variable naming the realtime base URL.
pub const ENV_REALTIME_URL: &str = "WMSYNC_REALTIME_URL";
/// Environment variable selecting the transport variant.
pub const ENV_TRANSPORT: &str = "WMSYNC_TRANSPORT";
/// Environment variable for the base reconnect delay in milliseconds.
pub const ENV_BACKOFF_BASE_MS: &str = "WMSYNC_BACKOFF_BASE_MS";
/// Environment variable for the reconnect delay ceiling in milliseconds.
pub const ENV_BACKOFF_MAX_MS: &str = "WMSYNC_BACKOFF_MAX_MS";
/// Environment variable capping reconnect attempts.
pub const ENV_MAX_RECONNECTS: &str = "WMSYNC_MAX_RECONNECTS";
/// Environment variable enabling resubscription after reconnect.
pub const ENV_RESUBSCRIBE: &str = "WMSYNC_RESUBSCRIBE";
/// Environment variable controlling stale fetch discarding.
pub const ENV_DISCARD_STALE: &str = "WMSYNC_DISCARD_STALE";

/// Configuration for the sync service.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// API client settings.
    pub api: ClientConfig,

    /// Realtime transport settings.
    pub realtime: RealtimeConfig,

    /// Whether a fetch result is dropped when a newer fetch for the same
    /// slice has been started.
    pub discard_stale_fetches: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api: ClientConfig::default(),
            realtime: RealtimeConfig::default(),
            discard_stale_fetches: true,
        }
    }
}

impl SyncConfig {
    /// Creates a configuration from explicit API and realtime settings.
    #[must_use]
    pub fn new(api: ClientConfig, realtime: RealtimeConfig) -> Self {
        Self {
            api,
            realtime,
            ..Default::default()
        }
    }

    /// Sets the stale fetch policy.
    #[must_use]
    pub fn with_discard_stale_fetches(mut self, discard: bool) -> Self {
        self.discard_stale_fetches = discard;
        self
    }

    /// Reads the configuration from the process environment, starting from
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a malformed value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api.base_url = url;
        }
        if let Some(variant) = lookup(ENV_TRANSPORT) {
            config.realtime.variant = parse(ENV_TRANSPORT, &variant)?;
        }
        if let Some(url) = lookup(ENV_REALTIME_URL) {
            config.realtime.base_url = url;
        }
        if let Some(ms) = lookup(ENV_BACKOFF_BASE_MS) {
            config.realtime.base_delay = Duration::from_millis(parse(ENV_BACKOFF_BASE_MS, &ms)?);
        }
        if let Some(ms) = lookup(ENV_BACKOFF_MAX_MS) {
            config.realtime.max_delay = Duration::from_millis(parse(ENV_BACKOFF_MAX_MS, &ms)?);
        }
        if let Some(attempts) = lookup(ENV_MAX_RECONNECTS) {
            config.realtime.max_reconnect_attempts = Some(parse(ENV_MAX_RECONNECTS, &attempts)?);
        }
        if let Some(flag) = lookup(ENV_RESUBSCRIBE) {
            config.realtime.resubscribe_on_reconnect = parse_flag(ENV_RESUBSCRIBE, &flag)?;
        }
        if let Some(flag) = lookup(ENV_DISCARD_STALE) {
            config.discard_stale_fetches = parse_flag(ENV_DISCARD_STALE, &flag)?;
        }

        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API or realtime settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api
            .validate()
            .map_err(|e| ConfigError::Api(e.to_string()))?;
        self.realtime
            .validate()
            .map_err(|e| ConfigError::Realtime(e.to_string()))?;
        Ok(())
    }

    /// Returns the configured transport variant.
    #[must_use]
    pub fn variant(&self) -> TransportVariant {
        self.realtime.variant
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable holds a value that cannot be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },

    /// Invalid API settings.
    #[error("invalid api config: {0}")]
    Api(String),

    /// Invalid realtime settings.
    #[error("invalid realtime config: {0}")]
    Realtime(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert!(config.discard_stale_fetches);
        assert_eq!(config.variant(), TransportVariant::Socket);
        assert!(!config.realtime.resubscribe_on_reconnect);
        assert!(config.realtime.max_reconnect_attempts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_empty_lookup() {
        let config = SyncConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.api.base_url, ClientConfig::default().base_url);
        assert_eq!(config.realtime.base_delay, Duration::from_secs(1));
        assert_eq!(config.realtime.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = SyncConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://api.example.com/v1"),
            (ENV_REALTIME_URL, "https://rt.example.com"),
            (ENV_TRANSPORT, "stream"),
            (ENV_BACKOFF_BASE_MS, "250"),
            (ENV_BACKOFF_MAX_MS, "8000"),
            (ENV_MAX_RECONNECTS, "12"),
            (ENV_RESUBSCRIBE, "true"),
            (ENV_DISCARD_STALE, "off"),
        ]))
        .expect("config");

        assert_eq!(config.api.base_url, "https://api.example.com/v1");
        assert_eq!(config.realtime.base_url, "https://rt.example.com");
        assert_eq!(config.variant(), TransportVariant::Stream);
        assert_eq!(config.realtime.base_delay, Duration::from_millis(250));
        assert_eq!(config.realtime.max_delay, Duration::from_secs(8));
        assert_eq!(config.realtime.max_reconnect_attempts, Some(12));
        assert!(config.realtime.resubscribe_on_reconnect);
        assert!(!config.discard_stale_fetches);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_invalid_number() {
        let result = SyncConfig::from_lookup(lookup(&[(ENV_BACKOFF_BASE_MS, "soon")]));
        assert_eq!(
            result.err(),
            Some(ConfigError::InvalidValue {
                key: ENV_BACKOFF_BASE_MS,
                value: "soon".to_string(),
            })
        );
    }

    #[test]
    fn test_config_invalid_transport() {
        let result = SyncConfig::from_lookup(lookup(&[(ENV_TRANSPORT, "carrier-pigeon")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_config_invalid_flag() {
        let result = SyncConfig::from_lookup(lookup(&[(ENV_RESUBSCRIBE, "maybe")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_config_validate_mismatched_scheme() {
        let config = SyncConfig::from_lookup(lookup(&[(ENV_TRANSPORT, "stream")])).expect("config");
        assert!(matches!(config.validate(), Err(ConfigError::Realtime(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::new(
            ClientConfig::new("https://api.example.com"),
            RealtimeConfig::socket("wss://rt.example.com"),
        )
        .with_discard_stale_fetches(false);

        assert!(!config.discard_stale_fetches);
        assert_eq!(config.api.base_url, "https://api.example.com");
    }
}
