//! Redis-backed store using deadpool-redis.

use super::{PresenceStore, StoreError, StoreResult};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::collections::HashMap;

/// Store pool configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL (e.g., `redis://localhost:6379`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&arena_common::RedisConfig> for StoreConfig {
    fn from(config: &arena_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

/// Managed Redis connection pool implementing the store primitives
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisStore {
    /// Create a new Redis store with the given configuration
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map_err(|e| StoreError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| StoreError::CreatePool(e.to_string()))?;

        // Redact credentials from URL for logging
        let safe_url = config.url.split('@').next_back().unwrap_or(&config.url);
        tracing::info!(
            url = %safe_url,
            max_connections = config.max_connections,
            "Redis store pool created"
        );

        Ok(Self { pool })
    }

    /// Create a new Redis store from the shared application config
    pub fn from_config(config: &arena_common::RedisConfig) -> StoreResult<Self> {
        Self::new(StoreConfig::from(config))
    }

    /// Get a connection from the pool
    pub async fn conn(&self) -> StoreResult<deadpool_redis::Connection> {
        self.pool.get().await.map_err(StoreError::GetConnection)
    }

    /// Check if the pool is healthy by pinging Redis
    pub async fn health_check(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Publish a raw payload on a pub/sub channel; returns receiver count.
    ///
    /// Pub/sub shares the connection pool but lives in its own namespace;
    /// channel names never collide with keys.
    pub async fn publish(&self, channel: &str, payload: &str) -> StoreResult<u32> {
        let mut conn = self.conn().await?;
        let receivers: u32 = conn.publish(channel, payload).await?;
        Ok(receivers)
    }
}

#[async_trait]
impl PresenceStore for RedisStore {
    async fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted: i32 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let result: bool = conn.expire(key, ttl as i64).await?;
        Ok(result)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<i64>> {
        let mut conn = self.conn().await?;
        let ttl: i64 = conn.ttl(key).await?;
        // Redis returns -2 if key doesn't exist, -1 if no TTL
        if ttl == -2 {
            Ok(None)
        } else {
            Ok(Some(ttl))
        }
    }

    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let added: i32 = conn.sadd(key, member).await?;
        Ok(added > 0)
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i32 = conn.srem(key, member).await?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn set_size(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let size: u64 = conn.scard(key).await?;
        Ok(size)
    }

    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let contains: bool = conn.sismember(key, member).await?;
        Ok(contains)
    }

    async fn hash_set_all(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.hset_multiple::<_, _, _, ()>(key, fields).await?;
        Ok(())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(key, field, value).await?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut conn = self.conn().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.url, "redis://127.0.0.1:6379");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_config_from_redis_config() {
        let redis_config = arena_common::RedisConfig {
            url: "redis://localhost:6380".to_string(),
            max_connections: 32,
        };
        let config = StoreConfig::from(&redis_config);
        assert_eq!(config.url, "redis://localhost:6380");
        assert_eq!(config.max_connections, 32);
    }
}
