//! # arena-db
//!
//! PostgreSQL implementations of the collaborator traits the presence layer
//! consumes: the durable user-status mirror and the read-only channel
//! membership directory.

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{PgChannelDirectory, PgUserStatusRepository};
