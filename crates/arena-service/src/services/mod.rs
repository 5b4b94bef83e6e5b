//! Presence services.

mod context;
mod coordinator;
mod error;
mod reconciler;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use coordinator::{Liveness, PresenceCoordinator, PresenceView, StatusUpdate};
pub use error::{ServiceError, ServiceResult};
pub use reconciler::{PresenceSweep, Reconciler, SessionSweep};
