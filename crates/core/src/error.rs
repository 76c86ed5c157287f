//! Error taxonomy for Cirrus.
//!
//! Every primitive and backend reports failures through [`Error`]. Only
//! [`Error::Conflict`] is recovered locally (inside the latch increment
//! loop); every other variant reaches the caller unchanged.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | Configuration | No backend configuration is active, or a descriptor is invalid |
//! | NotFound | A URI or name has no backing entity |
//! | Conflict | A version-conditioned write lost a race, or an insert hit an existing id |
//! | Serialization | A payload failed to encode or decode |
//! | Transport | The store or broker call itself failed |
//! | InvalidUri | A resource URI is malformed or has the wrong scheme |
//! | RetryExhausted | An optimistic-concurrency loop ran out of attempts |
//! | Overflow | A counter would exceed `i64::MAX` |
//! | Cancelled | A wait was cancelled through its token |

use thiserror::Error;

/// Message carried by [`Error::Configuration`] when nothing was activated.
pub const NO_ACTIVE_CONFIGURATION: &str = "no active backend configuration";

/// All Cirrus errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// No active backend configuration, or an unusable descriptor
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Entity not found (table, row, container, blob, queue)
    #[error("not found: {0}")]
    NotFound(String),

    /// Version mismatch or duplicate insert
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payload encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Underlying store or broker failure (network, auth, throttling, limits)
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed resource URI
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// Optimistic-concurrency retries exhausted
    #[error("retries exhausted on {resource} after {attempts} attempts")]
    RetryExhausted {
        /// Resource that was contended
        resource: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// Counter overflow
    #[error("overflow: {0}")]
    Overflow(String),

    /// Wait cancelled by the caller
    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Result type for Cirrus operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The error raised by every connection accessor before activation.
    pub fn not_configured() -> Self {
        Error::Configuration(NO_ACTIVE_CONFIGURATION.to_string())
    }

    /// Check if this error is retryable.
    ///
    /// Conflicts may succeed on retry with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Check if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
