//! PostgreSQL implementation of the channel membership directory.
//!
//! Membership durability belongs to the wider platform; the presence layer
//! only reads it, at join time and when validating channel online subsets.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use arena_core::{ChannelDirectory, ChannelId, RepoResult, UserId};

use super::map_db_error;

/// PostgreSQL implementation of [`ChannelDirectory`]
#[derive(Clone)]
pub struct PgChannelDirectory {
    pool: PgPool,
}

impl PgChannelDirectory {
    /// Create a new directory over the given pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelDirectory for PgChannelDirectory {
    #[instrument(skip(self))]
    async fn channels_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChannelId>> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            r"
            SELECT channel_id
            FROM channel_members
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(ChannelId::from).collect())
    }

    #[instrument(skip(self))]
    async fn members_of(&self, channel_id: ChannelId) -> RepoResult<Vec<UserId>> {
        let rows = sqlx::query_scalar::<_, Uuid>(
            r"
            SELECT user_id
            FROM channel_members
            WHERE channel_id = $1
            ",
        )
        .bind(channel_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(UserId::from).collect())
    }
}
