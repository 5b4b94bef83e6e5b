//! # arena-cache
//!
//! Shared-store layer for the presence system: primitive hash/set/TTL
//! operations over Redis (or an in-process store for tests), the key-space
//! contract, typed presence/session records, the session registry, and the
//! cross-instance pub/sub event bus.
//!
//! ## Example
//!
//! ```ignore
//! use arena_cache::{RedisStore, SessionRegistry, keys};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RedisStore::new(StoreConfig::default())?);
//! let registry = SessionRegistry::new(store.clone(), 86_400);
//!
//! registry.register(user_id, &session_id, metadata).await?;
//! let count = registry.session_count(user_id).await?;
//! ```

pub mod keys;
pub mod presence;
pub mod pubsub;
pub mod session;
pub mod store;

// Re-export store types
pub use store::{MemoryStore, PresenceStore, RedisStore, StoreConfig, StoreError, StoreResult};

// Re-export record types
pub use presence::{PresenceRecord, SessionRecord};

// Re-export session types
pub use session::{SessionMetadata, SessionRegistry};

// Re-export pubsub types
pub use pubsub::{
    BusChannel, BusError, BusEvent, BusMessage, BusResult, EventBus, EventTarget, MemoryBus,
    Publisher, RedisEventBus, Subscriber, SubscriberConfig, SubscriberError,
};
