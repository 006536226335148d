//! Error types for rate limiting operations.
//!
//! The error hierarchy mirrors the contract in the design notes: configuration
//! mistakes are never retried, backend failures feed the circuit breaker,
//! contention means the CAS retry budget was exhausted, and cancellation means
//! the caller asked to stop waiting.

use thiserror::Error;

/// Result type for rate limiting operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Top-level error type returned by every public operation.
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration or input key violates a validation rule. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// A failure reported by the backend (connectivity, protocol, timeout,
    /// or state-decoding failure). Feeds the circuit breaker.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The CAS retry budget was exhausted without a successful swap.
    #[error("contention: gave up after {attempts} attempt(s)")]
    Contention {
        /// Number of CAS attempts made before giving up.
        attempts: u32,
    },

    /// Cancellation was observed while waiting out a backoff delay.
    #[error("operation cancelled")]
    Cancelled,
}

impl RateLimitError {
    /// Construct a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True if retrying this exact call at a higher level is reasonable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Contention { .. } => true,
            Self::Backend(e) => e.is_retryable(),
            Self::Validation(_) | Self::Cancelled => false,
        }
    }
}

/// Backend-layer errors, produced by `Backend` implementations and the codec
/// layer (a `Decoding` failure is treated as backend-class data corruption,
/// never as contention).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend operation itself failed (connectivity, protocol, timeout).
    #[error("{message}")]
    Operation {
        /// Human-readable description.
        message: String,
        /// Whether the same operation might succeed if retried.
        retryable: bool,
    },

    /// A stored state string did not carry the expected header or was
    /// otherwise malformed.
    #[error("state decoding failed: {0}")]
    Decoding(String),

    /// Connection pool exhausted (remote backends only).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Failed to establish or maintain a connection to the backend.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl BackendError {
    /// Construct an operation-failed error.
    pub fn operation_failed(message: impl Into<String>, retryable: bool) -> Self {
        Self::Operation {
            message: message.into(),
            retryable,
        }
    }

    /// Whether this error is worth retrying at a higher level.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Operation { retryable, .. } => *retryable,
            Self::PoolExhausted => true,
            Self::Connection(_) => true,
            Self::Decoding(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_retryable() {
        assert!(BackendError::operation_failed("timeout", true).is_retryable());
        assert!(!BackendError::operation_failed("bad request", false).is_retryable());
        assert!(BackendError::PoolExhausted.is_retryable());
        assert!(!BackendError::Decoding("bad header".into()).is_retryable());
    }

    #[test]
    fn test_rate_limit_error_retryable() {
        assert!(RateLimitError::Contention { attempts: 3 }.is_retryable());
        assert!(!RateLimitError::Cancelled.is_retryable());
        assert!(!RateLimitError::validation("bad key").is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = RateLimitError::Contention { attempts: 5 };
        assert!(err.to_string().contains("5 attempt"));

        let err = RateLimitError::validation("key too long");
        assert_eq!(err.to_string(), "validation error: key too long");
    }
}
