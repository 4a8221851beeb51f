//! Error types for cache and retry operations
//!
//! `CacheError` is the crate-level error. Failures of the retry layer are
//! modelled separately in [`RetryError`](crate::resilience::RetryError) and
//! wrapped here when they cross into cache-facing APIs.

use crate::resilience::RetryError;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected by validation or unparsable from the environment
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An explicit expiry that is not strictly in the future
    #[error("Expiry {expires_at} is not after the insertion time {now}")]
    InvalidExpiration {
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Payload could not be encoded for size estimation
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The producer failed terminally or the retry loop was cancelled
    #[error(transparent)]
    Retry(#[from] RetryError),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::ConfigError("max_entries must be greater than 0".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: max_entries must be greater than 0"
        );

        let now = Utc::now();
        let expired = CacheError::InvalidExpiration {
            expires_at: now - chrono::Duration::seconds(5),
            now,
        };
        assert!(expired.to_string().contains("is not after the insertion time"));
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: CacheError = parse_err.into();
        assert!(matches!(error, CacheError::SerializationError(_)));
    }
}
