//! # arena-gateway
//!
//! WebSocket gateway for the arena chat presence layer: connection
//! lifecycle, wire protocol, and cross-instance event fan-out.

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_gateway_state, run, GatewayState};
