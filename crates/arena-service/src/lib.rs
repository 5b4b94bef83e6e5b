//! # arena-service
//!
//! Application layer for the presence system: the coordinator state machine,
//! the reconciliation sweeps, and the dependency container that wires them
//! to a store, a durable mirror, and an event bus.

pub mod services;

pub use services::{
    Liveness, PresenceCoordinator, PresenceSweep, PresenceView, Reconciler, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SessionSweep, StatusUpdate,
};
