use super::CacheStore;
use crate::error::CacheResult;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Redis-backed cache shared by every replica of a service.
///
/// Values are stored as JSON strings with `SET … EX`. The connection
/// manager reconnects on its own after transient failures.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore").finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Open a managed connection to `url`.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to Redis cache");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> CacheResult<()> {
        let payload = serde_json::to_string(value)?;
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, payload).await?;
        } else {
            // EX takes whole seconds; round sub-second TTLs up.
            let secs = ttl.as_secs().max(1);
            let _: () = conn.set_ex(key, payload, secs).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn flush(&self) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }
}
