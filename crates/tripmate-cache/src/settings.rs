//! Cache settings read from the environment.

use crate::error::{CacheError, CacheResult};
use crate::layer::CacheLayer;
use crate::read_through::CachePolicy;
use crate::store::RedisCacheStore;
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Backend selection and per-upstream TTLs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Redis connection URL; the in-memory store is used when unset.
    pub redis_url: Option<String>,
    pub weather_cache_ttl_secs: u64,
    pub places_cache_ttl_secs: u64,
    pub currency_cache_ttl_secs: u64,
    /// How often the in-memory store drops expired entries.
    pub cache_purge_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            weather_cache_ttl_secs: 900,
            places_cache_ttl_secs: 86_400,
            currency_cache_ttl_secs: 3_600,
            cache_purge_interval_secs: 60,
        }
    }
}

impl CacheSettings {
    pub fn from_env() -> CacheResult<Self> {
        Self::build(Environment::default().try_parsing(true))
    }

    pub fn from_vars(vars: HashMap<String, String>) -> CacheResult<Self> {
        Self::build(Environment::default().source(Some(vars)).try_parsing(true))
    }

    fn build(env: Environment) -> CacheResult<Self> {
        Config::builder()
            .add_source(env)
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| CacheError::Settings(e.to_string()))
    }

    pub fn weather_policy(&self) -> CachePolicy {
        CachePolicy::weather(Duration::from_secs(self.weather_cache_ttl_secs))
    }

    pub fn places_policy(&self) -> CachePolicy {
        CachePolicy::places(Duration::from_secs(self.places_cache_ttl_secs))
    }

    pub fn currency_pair_policy(&self) -> CachePolicy {
        CachePolicy::currency_pair(Duration::from_secs(self.currency_cache_ttl_secs))
    }

    pub fn currency_rates_policy(&self) -> CachePolicy {
        CachePolicy::currency_rates(Duration::from_secs(self.currency_cache_ttl_secs))
    }

    /// Build the configured cache layer.
    ///
    /// Fails only when a Redis URL is set and the initial connection cannot
    /// be made.
    pub async fn connect(&self) -> CacheResult<CacheLayer> {
        match self.redis_url.as_deref().filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let store = RedisCacheStore::connect(url).await?;
                Ok(CacheLayer::new(Arc::new(store)))
            }
            None => {
                info!("REDIS_URL not set, using in-memory cache");
                Ok(self.memory_layer())
            }
        }
    }

    /// Like [`connect`](Self::connect), degrading to the in-memory store
    /// when Redis is unreachable.
    pub async fn connect_or_memory(&self) -> CacheLayer {
        match self.connect().await {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
                self.memory_layer()
            }
        }
    }

    fn memory_layer(&self) -> CacheLayer {
        let interval = Duration::from_secs(self.cache_purge_interval_secs.max(1));
        CacheLayer::in_memory_with_purge(interval)
    }
}
