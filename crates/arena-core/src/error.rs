//! Domain errors

use crate::ids::{ChannelId, UserId};
use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl DomainError {
    /// Check if this is a not-found error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound(_) | Self::ChannelNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        assert!(DomainError::UserNotFound(UserId::random()).is_not_found());
        assert!(!DomainError::Database("boom".into()).is_not_found());
    }
}
