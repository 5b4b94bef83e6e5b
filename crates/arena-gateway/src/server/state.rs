//! Gateway state
//!
//! Shared dependencies for the gateway server.

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionManager;
use arena_common::AppConfig;
use arena_service::ServiceContext;
use std::sync::Arc;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    /// Service context with the coordinator, registry, and collaborators
    context: Arc<ServiceContext>,
    /// Connection manager for this instance's sockets
    connection_manager: Arc<ConnectionManager>,
    /// Event dispatcher routing bus messages to connections
    event_dispatcher: Arc<EventDispatcher>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        context: ServiceContext,
        connection_manager: Arc<ConnectionManager>,
        event_dispatcher: Arc<EventDispatcher>,
        config: AppConfig,
    ) -> Self {
        Self {
            context: Arc::new(context),
            connection_manager,
            event_dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get the service context
    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Get the event dispatcher
    pub fn event_dispatcher(&self) -> &EventDispatcher {
        &self.event_dispatcher
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .finish()
    }
}
