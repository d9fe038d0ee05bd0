//! TTL key-value store
//!
//! Backing storage for session records. Two drivers:
//! - In-memory (moka) - default, for single-instance deployment
//! - Redis - optional (`redis-cache` feature), for shared deployments
//!
//! Every entry carries its own time-to-live; an entry is never returned
//! after it has expired.

pub mod memory;
#[cfg(feature = "redis-cache")]
pub mod redis;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SessionStoreConfig, SessionStoreDriver};

/// Key-value store with per-entry expiry
///
/// The generic methods keep this trait out of `dyn` position; use the
/// `Cache` enum for runtime selection of the driver.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value, `None` when absent or expired
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value that expires after `ttl`, replacing any previous value
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration)
        -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}

pub use memory::MemoryCache;
#[cfg(feature = "redis-cache")]
pub use redis::RedisCache;

/// Driver selected at startup
#[derive(Debug)]
pub enum Cache {
    Memory(MemoryCache),
    #[cfg(feature = "redis-cache")]
    Redis(RedisCache),
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
            #[cfg(feature = "redis-cache")]
            Cache::Redis(cache) => cache.delete(key).await,
        }
    }
}

/// Create the store described by the session configuration
///
/// # Errors
/// - Redis is configured but the `redis-cache` feature is not enabled
/// - Redis is configured without a URL, or the connection check fails
pub async fn create_cache(config: &SessionStoreConfig) -> Result<Arc<Cache>> {
    match config.driver {
        SessionStoreDriver::Memory => {
            let cache = MemoryCache::new();
            Ok(Arc::new(Cache::Memory(cache)))
        }
        SessionStoreDriver::Redis => {
            #[cfg(feature = "redis-cache")]
            {
                let redis_url = config.redis_url.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Redis URL is required when using the redis session driver. \
                         Set 'session.redis_url' or INKPOST_SESSION_REDIS_URL."
                    )
                })?;

                let cache = RedisCache::connect(
                    redis_url,
                    Duration::from_millis(config.connect_timeout_ms),
                    Duration::from_millis(config.response_timeout_ms),
                )
                .await?;
                Ok(Arc::new(Cache::Redis(cache)))
            }

            #[cfg(not(feature = "redis-cache"))]
            {
                anyhow::bail!(
                    "Redis session driver is configured but the 'redis-cache' feature is not enabled. \
                     Either enable the feature with `--features redis-cache` or use the 'memory' driver."
                )
            }
        }
    }
}
