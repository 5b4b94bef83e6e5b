//! Service layer error types

use arena_cache::{BusError, StoreError};
use arena_core::DomainError;
use thiserror::Error;

/// Service layer error type
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Shared store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Durable collaborator failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Event bus failure
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
