//! Store primitives
//!
//! The [`PresenceStore`] trait is the seam between presence logic and the
//! shared store: primitive hash/set/TTL operations, no policy. Production
//! uses [`RedisStore`]; tests and store-less development use [`MemoryStore`].

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::{RedisStore, StoreConfig};

use async_trait::async_trait;
use std::collections::HashMap;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to create store pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Store command error: {0}")]
    Command(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Primitive operations against the shared key/value store.
///
/// Everything crosses this boundary as strings; typed records serialize at
/// the edge (see `presence::records`). All mutations are single-key and
/// idempotent so concurrent writers from different instances converge
/// without coordination.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    // === Plain keys ===

    /// Set a plain key, optionally with a TTL in seconds
    async fn put(&self, key: &str, value: &str, ttl: Option<u64>) -> StoreResult<()>;

    /// Get a plain key's value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete a key of any type; returns whether it existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Check whether a key exists
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Set the TTL of an existing key; `ttl == 0` deletes it (Redis semantics)
    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool>;

    /// Remaining TTL in seconds. `None` if the key is missing, `Some(-1)` if
    /// it has no expiry.
    async fn ttl(&self, key: &str) -> StoreResult<Option<i64>>;

    // === Sets ===

    /// Add a member; returns whether it was newly added
    async fn set_add(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// Remove a member; returns whether it was present
    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// All members of a set
    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Set cardinality
    async fn set_size(&self, key: &str) -> StoreResult<u64>;

    /// Membership test
    async fn set_contains(&self, key: &str, member: &str) -> StoreResult<bool>;

    // === Hashes ===

    /// Set multiple hash fields at once
    async fn hash_set_all(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()>;

    /// Set a single hash field
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// All fields of a hash; empty map if the key is missing
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;
}
