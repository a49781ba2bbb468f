//! Storage error types.
//!
//! Every [`EphemeralStore`](crate::EphemeralStore) operation is fallible:
//! the distributed backend is a network service, and even the in-process
//! store can reject malformed counter values. Callers on request paths
//! are expected to log these errors and fall back to their permissive
//! default rather than fail the request.

/// Errors that can occur during ephemeral store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or failed to execute a command.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A connection to the backend could not be obtained.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// An increment was attempted on a key holding a non-numeric value.
    #[error("Non-numeric counter value for key: {key}")]
    NonNumericValue {
        /// The offending key.
        key: String,
    },
}

impl StoreError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `NonNumericValue` error.
    #[must_use]
    pub fn non_numeric_value(key: impl Into<String>) -> Self {
        Self::NonNumericValue { key: key.into() }
    }

    /// Returns `true` if the error indicates the backend is unreachable
    /// or misbehaving, as opposed to a caller-side usage error.
    #[must_use]
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::backend("timeout after 2s");
        assert_eq!(err.to_string(), "Backend error: timeout after 2s");

        let err = StoreError::connection("pool exhausted");
        assert_eq!(err.to_string(), "Connection error: pool exhausted");

        let err = StoreError::non_numeric_value("ratelimit:attempts:10.0.0.1");
        assert_eq!(
            err.to_string(),
            "Non-numeric counter value for key: ratelimit:attempts:10.0.0.1"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(StoreError::backend("x").is_backend_error());
        assert!(StoreError::connection("x").is_backend_error());
        assert!(!StoreError::non_numeric_value("k").is_backend_error());
    }
}
