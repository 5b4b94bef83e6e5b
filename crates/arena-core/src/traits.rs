//! Collaborator traits (ports)
//!
//! The presence layer consumes the rest of the platform through these two
//! narrow interfaces. The domain defines what it needs; infrastructure
//! provides the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::ids::{ChannelId, UserId};
use crate::status::PresenceStatus;

/// Result type for collaborator operations
pub type RepoResult<T> = Result<T, DomainError>;

/// A user's durably stored status, used as the fallback when the cached
/// presence record has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurableStatus {
    pub status: PresenceStatus,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Durable mirror of user presence.
///
/// Writes are best-effort: the cache-side record is authoritative while it
/// lives, the mirror only survives it.
#[async_trait]
pub trait UserStatusRepository: Send + Sync {
    /// Persist the user's latest status and last-seen timestamp
    async fn update_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Read the durably stored status (None if the user is unknown)
    async fn read_status(&self, user_id: UserId) -> RepoResult<Option<DurableStatus>>;
}

/// Read-only view of durable channel membership, consulted at join time.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Channels the user is a member of
    async fn channels_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChannelId>>;

    /// Members of a channel
    async fn members_of(&self, channel_id: ChannelId) -> RepoResult<Vec<UserId>>;
}
