//! Cache error types.

use thiserror::Error;

/// Errors raised by a [`CacheStore`](crate::store::CacheStore) backend.
///
/// [`CacheLayer`](crate::layer::CacheLayer) logs and swallows all of these;
/// they only surface to callers that talk to a store directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache settings error: {0}")]
    Settings(String),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
