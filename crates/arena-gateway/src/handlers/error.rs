//! Handler error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Invalid payload received
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Not authenticated
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Already authenticated
    #[error("Already authenticated")]
    AlreadyAuthenticated,

    /// Service error
    #[error("Service error: {0}")]
    Service(#[from] arena_service::ServiceError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] arena_cache::StoreError),

    /// Event bus error
    #[error("Bus error: {0}")]
    Bus(#[from] arena_cache::BusError),

    /// Durable collaborator error
    #[error("Domain error: {0}")]
    Domain(#[from] arena_core::DomainError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Convert to a close code (if the error should close the socket)
    #[must_use]
    pub fn to_close_code(&self) -> Option<CloseCode> {
        match self {
            Self::InvalidPayload(_) => Some(CloseCode::DecodeError),
            Self::AuthenticationFailed(_) => Some(CloseCode::AuthenticationFailed),
            Self::NotAuthenticated => Some(CloseCode::NotAuthenticated),
            Self::AlreadyAuthenticated => Some(CloseCode::AlreadyAuthenticated),
            Self::Service(_) | Self::Store(_) | Self::Bus(_) | Self::Domain(_) | Self::Internal(_) => {
                Some(CloseCode::UnknownError)
            }
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
