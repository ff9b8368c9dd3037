//! Cache storage backends.

mod memory;
mod redis_store;

pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;

use crate::error::CacheResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A key/value store holding JSON values with a time-to-live.
///
/// A zero `ttl` stores the value without expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Fetch a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Remove every key.
    async fn flush(&self) -> CacheResult<()>;
}
