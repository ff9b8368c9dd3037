//! Fault-tolerant facade over a [`CacheStore`].

use crate::store::{CacheStore, MemoryCacheStore};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

/// Result of a cache read as seen by request handling.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Hit(Value),
    Miss,
}

/// Shared handle used by request handlers.
///
/// Backend errors are logged and swallowed: a failed read is a miss and a
/// failed write is dropped. Writes run on a [`TaskTracker`] so the response
/// never waits on them, while shutdown can still drain them.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn CacheStore>,
    pending: TaskTracker,
    background: CancellationToken,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("store", &self.store.name())
            .field("pending_writes", &self.pending.len())
            .finish()
    }
}

impl CacheLayer {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            pending: TaskTracker::new(),
            background: CancellationToken::new(),
        }
    }

    /// A layer over a fresh [`MemoryCacheStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()))
    }

    /// A layer over a fresh [`MemoryCacheStore`] whose expired entries are
    /// purged every `interval` until [`shutdown`](Self::shutdown).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn in_memory_with_purge(interval: Duration) -> Self {
        let store = Arc::new(MemoryCacheStore::new());
        let layer = Self::new(Arc::clone(&store) as Arc<dyn CacheStore>);
        store.spawn_purge(interval, layer.background.clone());
        layer
    }

    pub fn backend(&self) -> &str {
        self.store.name()
    }

    pub async fn get(&self, key: &str) -> Lookup {
        match self.store.get(key).await {
            Ok(Some(value)) => Lookup::Hit(value),
            Ok(None) => Lookup::Miss,
            Err(e) => {
                error!(cache_key = %key, error = %e, "Cache read failed, treating as miss");
                Lookup::Miss
            }
        }
    }

    /// Store `value` in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn set_detached(&self, key: String, value: Value, ttl: Duration) {
        let store = Arc::clone(&self.store);
        self.pending.spawn(async move {
            match store.set(&key, &value, ttl).await {
                Ok(()) => debug!(cache_key = %key, ttl_secs = ttl.as_secs(), "Cached response"),
                Err(e) => error!(cache_key = %key, error = %e, "Cache write failed"),
            }
        });
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(cache_key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    pub async fn flush(&self) {
        if let Err(e) = self.store.flush().await {
            error!(error = %e, "Cache flush failed");
        }
    }

    /// Wait until every write issued so far has finished.
    pub async fn settle(&self) {
        self.pending.close();
        self.pending.wait().await;
        self.pending.reopen();
    }

    /// Stop background maintenance and drain pending writes. Writes issued
    /// afterwards are still accepted but no longer awaited.
    pub async fn shutdown(&self) {
        self.background.cancel();
        self.pending.close();
        self.pending.wait().await;
    }
}
