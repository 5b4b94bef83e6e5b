//! PostgreSQL implementation of the durable user-status mirror.
//!
//! The cache-side presence record is authoritative while it lives; these
//! columns only survive it, serving the fallback read and "last seen"
//! display.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use arena_core::{
    DurableStatus, PresenceStatus, RepoResult, UserId, UserStatusRepository,
};

use super::map_db_error;

#[derive(Debug, sqlx::FromRow)]
struct UserStatusRow {
    status: Option<String>,
    last_seen: Option<DateTime<Utc>>,
}

/// PostgreSQL implementation of [`UserStatusRepository`]
#[derive(Clone)]
pub struct PgUserStatusRepository {
    pool: PgPool,
}

impl PgUserStatusRepository {
    /// Create a new repository over the given pool
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStatusRepository for PgUserStatusRepository {
    #[instrument(skip(self))]
    async fn update_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE users
            SET status = $2, is_online = $3, last_seen = $4, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .bind(status.as_str())
        .bind(status.is_online())
        .bind(last_seen)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_status(&self, user_id: UserId) -> RepoResult<Option<DurableStatus>> {
        let row = sqlx::query_as::<_, UserStatusRow>(
            r"
            SELECT status, last_seen
            FROM users
            WHERE id = $1
            ",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|row| DurableStatus {
            status: row
                .status
                .and_then(|s| s.parse().ok())
                .unwrap_or(PresenceStatus::Offline),
            last_seen: row.last_seen,
        }))
    }
}
