//! Redis store
//!
//! Values are JSON strings written with `PSETEX` so that expiry keeps
//! millisecond precision.

use super::CacheLayer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

/// Redis-backed store sharing one multiplexed connection
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Connect and verify the server answers `PING`
    ///
    /// # Errors
    /// Returns an error if the URL is invalid, the connection cannot be
    /// established within `connect_timeout`, or the ping fails.
    pub async fn connect(
        redis_url: &str,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::open(redis_url).context("Failed to create Redis client")?;

        let mut connection = client
            .get_multiplexed_async_connection_with_timeouts(response_timeout, connect_timeout)
            .await
            .context("Failed to connect to Redis")?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .context("Redis did not answer PING")?;

        tracing::info!("Connected to Redis session store");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheLayer for RedisCache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(key)
            .await
            .context("Failed to get value from Redis")?;

        match result {
            Some(json) => {
                let value =
                    serde_json::from_str(&json).context("Failed to deserialize cached value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.connection.clone();

        let json = serde_json::to_string(value).context("Failed to serialize cache value")?;
        // PSETEX rejects zero
        let ttl_ms = (ttl.as_millis() as u64).max(1);

        let _: () = conn
            .pset_ex(key, json, ttl_ms)
            .await
            .context("Failed to set value in Redis")?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();

        let _: () = conn
            .del(key)
            .await
            .context("Failed to delete key from Redis")?;

        Ok(())
    }
}
