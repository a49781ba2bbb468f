//! Guard error types.
//!
//! Two kinds of failure leave this layer: validation failures (a token
//! that is unknown, expired, or bound to someone else) that the caller
//! turns into an HTTP 401/403, and storage failures that were *not*
//! converted to a fail-open default. Backend errors on check paths never
//! surface here - they are logged and absorbed at the point of
//! occurrence.

use time::OffsetDateTime;

use gatehouse_store::StoreError;

/// Errors that can occur during security-state operations.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A required token value was empty.
    #[error("Missing token")]
    MissingToken,

    /// The token is not known to the store.
    #[error("Unknown token")]
    UnknownToken,

    /// The token exists but its expiry has passed.
    #[error("Token expired")]
    TokenExpired,

    /// The token is bound to a different user than the caller claims.
    #[error("Token does not belong to this user")]
    UserMismatch,

    /// Header- and cookie-supplied CSRF tokens do not match.
    #[error("CSRF header and cookie tokens do not match")]
    HeaderMismatch,

    /// An identifier argument was empty or malformed.
    #[error("Invalid identifier: {message}")]
    InvalidIdentifier {
        /// Description of what was wrong with the identifier.
        message: String,
    },

    /// The identifier is temporarily blocked.
    #[error("Rate limited until {reset_at}")]
    RateLimited {
        /// When the block elapses and attempts are counted again.
        reset_at: OffsetDateTime,
    },

    /// An error occurred while reading or writing security state.
    #[error("Storage error: {message}")]
    Store {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl GuardError {
    /// Creates a new `InvalidIdentifier` error.
    #[must_use]
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }

    /// Creates a new `RateLimited` error.
    #[must_use]
    pub fn rate_limited(reset_at: OffsetDateTime) -> Self {
        Self::RateLimited { reset_at }
    }

    /// Creates a new `Store` error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for rejections the caller should map to an HTTP
    /// 401/403 rather than a 5xx.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::UnknownToken
                | Self::TokenExpired
                | Self::UserMismatch
                | Self::HeaderMismatch
                | Self::InvalidIdentifier { .. }
                | Self::RateLimited { .. }
        )
    }

    /// Returns `true` if the error originated in the storage layer.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store { .. })
    }

    /// Returns `true` for errors detected before any backend call.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingToken | Self::InvalidIdentifier { .. })
    }
}

impl From<StoreError> for GuardError {
    fn from(err: StoreError) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}
