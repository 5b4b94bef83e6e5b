//! PostgreSQL repository implementations.

mod channel_directory;
mod user_status;

pub use channel_directory::PgChannelDirectory;
pub use user_status::PgUserStatusRepository;

use arena_core::DomainError;

/// Map a sqlx error into a domain error
pub(crate) fn map_db_error(err: sqlx::Error) -> DomainError {
    DomainError::Database(err.to_string())
}
