//! Error types for the probe registry
//!
//! This module defines all error types used throughout the crate.
//!
//! Validation, conflict, not-found and credential-format errors are
//! expected outcomes the caller can correct. Store and internal errors
//! come from a backing service and are opaque to the caller.

use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the probe registry
#[derive(Error, Debug)]
pub enum Error {
    /// A probe field failed structural or semantic validation
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Offending value as supplied
        value: String,
        /// Human-readable reason
        reason: String,
    },

    /// Another enabled probe already holds this key
    #[error("{field} already registered: {value}")]
    Conflict {
        /// Unique key that collided (`fqdn` or `ipv4`)
        field: &'static str,
        /// Colliding value
        value: String,
    },

    /// No probe with this id
    #[error("probe not found: {0}")]
    NotFound(String),

    /// SSH credential material is missing or not base64
    #[error("credential error: {0}")]
    CredentialFormat(String),

    /// Probe store failure
    #[error("store error: {0}")]
    Store(String),

    /// Unexpected failure that is not the caller's fault
    #[error("internal error: {0}")]
    Internal(String),

    /// Geolocation backend failure
    #[error("geo lookup error: {0}")]
    Geo(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error for `field`
    pub fn validation(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a uniqueness conflict on `field`
    pub fn conflict(field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            value: value.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a credential format error
    pub fn credential_format(msg: impl Into<String>) -> Self {
        Self::CredentialFormat(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a geolocation error
    pub fn geo(msg: impl Into<String>) -> Self {
        Self::Geo(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is a backing-service failure rather than
    /// something the caller can fix.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::Internal(_)
                | Self::Geo(_)
                | Self::Io(_)
                | Self::Json(_)
                | Self::Other(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
