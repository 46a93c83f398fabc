//! SDK error types.
//!
//! Provides error types for parsing and validating domain values.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Unknown user type discriminator.
    #[error("invalid user type: {0}")]
    InvalidUserType(String),

    /// Malformed channel name.
    #[error("invalid channel: {0}")]
    InvalidChannel(String),

    /// Unknown channel scope.
    #[error("invalid channel scope: {0}")]
    InvalidScope(String),

    /// A profile lacks the foreign key its user type requires.
    #[error("missing {field} for {user_type} user")]
    MissingScopeKey {
        /// The user type that requires the key.
        user_type: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}
