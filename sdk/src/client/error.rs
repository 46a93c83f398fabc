//! Errors raised by the API layer.
//!
//! Every error that comes out of a request names the request path, so the
//! message a slice records says which endpoint failed. The classification of
//! non-2xx responses and the retry policy live here as well.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

/// Delay before retrying a rate-limited call that sent no `Retry-After`.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Base delay for retrying a timed-out call; doubled per attempt.
const TIMEOUT_RETRY_BASE: Duration = Duration::from_millis(100);

/// The `{error: {code, message}}` body the API sends with failures.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// API layer errors.
#[derive(Debug)]
pub enum ClientError {
    /// The request could not be sent or its body not read.
    Request {
        /// Request path.
        path: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// A successful response lacked the expected envelope.
    Deserialization {
        /// Request path.
        path: String,
        /// What did not decode.
        reason: String,
    },

    /// The API refused the call.
    Api {
        /// Request path.
        path: String,
        /// Server error code, or the HTTP status when the body had none.
        code: String,
        /// Server message.
        message: String,
    },

    /// Still rate limited after every retry.
    RateLimited {
        /// Request path.
        path: String,
        /// Wait the server asked for.
        retry_after: Option<Duration>,
    },

    /// The tenant or resource does not exist.
    NotFound {
        /// Request path.
        path: String,
    },

    /// No access token, or the API refused it.
    Unauthorized,

    /// Invalid client configuration.
    InvalidConfig(String),

    /// Every attempt timed out.
    Timeout {
        /// Request path.
        path: String,
    },
}

impl ClientError {
    /// Classifies a non-2xx response.
    #[must_use]
    pub fn from_status(
        path: &str,
        status: StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> Self {
        let path = path.to_string();
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound { path },
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited { path, retry_after },
            _ => match serde_json::from_str::<ErrorEnvelope>(body) {
                Ok(envelope) => Self::Api {
                    path,
                    code: envelope.error.code,
                    message: envelope.error.message,
                },
                Err(_) => Self::Api {
                    path,
                    code: status.as_str().to_string(),
                    message: body.trim().to_string(),
                },
            },
        }
    }

    /// Wraps a reqwest failure for `path`; timeouts become [`Self::Timeout`].
    #[must_use]
    pub fn transport(path: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                path: path.to_string(),
            }
        } else {
            Self::Request {
                path: path.to_string(),
                source,
            }
        }
    }

    /// Whether another attempt may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout { .. })
    }

    /// How long to wait before retry number `attempt` (starting at 1).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::RateLimited {
                retry_after: Some(wait),
                ..
            } => *wait,
            Self::RateLimited { .. } => DEFAULT_RATE_LIMIT_WAIT,
            _ => TIMEOUT_RETRY_BASE.saturating_mul(1u32 << attempt.min(10)),
        }
    }

    /// The request path, for errors raised by a request.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Request { path, .. }
            | Self::Deserialization { path, .. }
            | Self::Api { path, .. }
            | Self::RateLimited { path, .. }
            | Self::NotFound { path }
            | Self::Timeout { path } => Some(path),
            Self::Unauthorized | Self::InvalidConfig(_) => None,
        }
    }

    /// Human-readable message recorded next to stale data.
    ///
    /// API refusals yield the server's own message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { path, source } => write!(f, "request to {} failed: {}", path, source),
            Self::Deserialization { path, reason } => {
                write!(f, "unexpected response from {}: {}", path, reason)
            }
            Self::Api {
                path,
                code,
                message,
            } => write!(f, "{} refused [{}]: {}", path, code, message),
            Self::RateLimited { path, retry_after } => match retry_after {
                Some(wait) => write!(
                    f,
                    "rate limited on {}, retry after {}s",
                    path,
                    wait.as_secs()
                ),
                None => write!(f, "rate limited on {}", path),
            },
            Self::NotFound { path } => write!(f, "{} not found", path),
            Self::Unauthorized => write!(f, "not signed in"),
            Self::InvalidConfig(msg) => write!(f, "invalid client configuration: {}", msg),
            Self::Timeout { path } => write!(f, "request to {} timed out", path),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_becomes_api_error() {
        let err = ClientError::from_status(
            "/wms/w1/roles",
            StatusCode::CONFLICT,
            None,
            r#"{"error":{"code":"ROLE_IN_USE","message":"role still has members"}}"#,
        );

        assert_eq!(err.message(), "role still has members");
        assert_eq!(err.path(), Some("/wms/w1/roles"));
        assert_eq!(
            err.to_string(),
            "/wms/w1/roles refused [ROLE_IN_USE]: role still has members"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_plain_body_keeps_status_code() {
        let err = ClientError::from_status("/me", StatusCode::BAD_GATEWAY, None, "upstream down\n");
        assert_eq!(err.to_string(), "/me refused [502]: upstream down");

        let err = ClientError::from_status("/me", StatusCode::INTERNAL_SERVER_ERROR, None, "");
        assert_eq!(err.message(), "/me refused [500]: ");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ClientError::from_status("/me", StatusCode::UNAUTHORIZED, None, ""),
            ClientError::Unauthorized
        ));

        let missing = ClientError::from_status("/companies/c9", StatusCode::NOT_FOUND, None, "");
        assert_eq!(missing.message(), "/companies/c9 not found");

        let limited = ClientError::from_status(
            "/companies/c1/users",
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(30)),
            "",
        );
        assert!(limited.is_retryable());
        assert_eq!(
            limited.to_string(),
            "rate limited on /companies/c1/users, retry after 30s"
        );
    }

    #[test]
    fn test_retry_delay() {
        let limited = ClientError::RateLimited {
            path: "/me".to_string(),
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(limited.retry_delay(1), Duration::from_secs(7));

        let limited = ClientError::RateLimited {
            path: "/me".to_string(),
            retry_after: None,
        };
        assert_eq!(limited.retry_delay(3), DEFAULT_RATE_LIMIT_WAIT);

        let timeout = ClientError::Timeout {
            path: "/me".to_string(),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.retry_delay(1), Duration::from_millis(200));
        assert_eq!(timeout.retry_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_errors_without_path() {
        assert_eq!(ClientError::Unauthorized.path(), None);
        assert_eq!(ClientError::Unauthorized.message(), "not signed in");
        assert!(!ClientError::InvalidConfig("x".to_string()).is_retryable());
    }
}
