//! Service context - dependency container
//!
//! Explicit service objects with injected dependencies; no global state, so
//! independent instances can be constructed side by side (as production
//! processes or in tests).

use std::sync::Arc;

use arena_cache::{EventBus, PresenceStore, SessionRegistry};
use arena_common::{JwtService, PresenceConfig};
use arena_core::{ChannelDirectory, UserStatusRepository};

use super::coordinator::PresenceCoordinator;
use super::error::ServiceError;
use super::reconciler::Reconciler;

/// Dependency container handed to the gateway.
///
/// Provides the presence coordinator and reconciler plus the collaborators
/// the connection lifecycle needs directly: the store (typing keys, channel
/// sets), the channel directory, the event bus, and token verification.
#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn PresenceStore>,
    registry: SessionRegistry,
    coordinator: PresenceCoordinator,
    reconciler: Arc<Reconciler>,
    channels: Arc<dyn ChannelDirectory>,
    bus: Arc<dyn EventBus>,
    jwt: Arc<JwtService>,
    presence: PresenceConfig,
    instance_id: String,
}

impl ServiceContext {
    /// Get the store
    pub fn store(&self) -> &Arc<dyn PresenceStore> {
        &self.store
    }

    /// Get the session registry
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Get the presence coordinator
    pub fn coordinator(&self) -> &PresenceCoordinator {
        &self.coordinator
    }

    /// Get the reconciler
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Get the channel directory
    pub fn channels(&self) -> &Arc<dyn ChannelDirectory> {
        &self.channels
    }

    /// Get the event bus
    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }

    /// Get the JWT service
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Get the presence tunables
    pub fn presence(&self) -> &PresenceConfig {
        &self.presence
    }

    /// Get this process's instance id
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

/// Builder for [`ServiceContext`]
#[derive(Default)]
pub struct ServiceContextBuilder {
    store: Option<Arc<dyn PresenceStore>>,
    users: Option<Arc<dyn UserStatusRepository>>,
    channels: Option<Arc<dyn ChannelDirectory>>,
    bus: Option<Arc<dyn EventBus>>,
    jwt: Option<Arc<JwtService>>,
    presence: Option<PresenceConfig>,
    instance_id: Option<String>,
}

impl ServiceContextBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store
    #[must_use]
    pub fn store(mut self, store: Arc<dyn PresenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the durable user-status mirror
    #[must_use]
    pub fn users(mut self, users: Arc<dyn UserStatusRepository>) -> Self {
        self.users = Some(users);
        self
    }

    /// Set the channel directory
    #[must_use]
    pub fn channels(mut self, channels: Arc<dyn ChannelDirectory>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Set the event bus
    #[must_use]
    pub fn bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Set the JWT service
    #[must_use]
    pub fn jwt(mut self, jwt: Arc<JwtService>) -> Self {
        self.jwt = Some(jwt);
        self
    }

    /// Set the presence tunables
    #[must_use]
    pub fn presence(mut self, presence: PresenceConfig) -> Self {
        self.presence = Some(presence);
        self
    }

    /// Set this process's instance id
    #[must_use]
    pub fn instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Build the context, wiring the coordinator and reconciler
    pub fn build(self) -> Result<ServiceContext, ServiceError> {
        let store = self
            .store
            .ok_or_else(|| ServiceError::internal("store is required"))?;
        let users = self
            .users
            .ok_or_else(|| ServiceError::internal("user status repository is required"))?;
        let channels = self
            .channels
            .ok_or_else(|| ServiceError::internal("channel directory is required"))?;
        let bus = self
            .bus
            .ok_or_else(|| ServiceError::internal("event bus is required"))?;
        let jwt = self
            .jwt
            .ok_or_else(|| ServiceError::internal("jwt service is required"))?;
        let presence = self.presence.unwrap_or_default();
        let instance_id = self.instance_id.unwrap_or_else(|| "single".to_string());

        let registry = SessionRegistry::new(store.clone(), presence.session_ttl);
        let coordinator = PresenceCoordinator::new(
            store.clone(),
            registry.clone(),
            users,
            presence,
            instance_id.clone(),
        );
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            coordinator.clone(),
            presence,
        ));

        Ok(ServiceContext {
            store,
            registry,
            coordinator,
            reconciler,
            channels,
            bus,
            jwt,
            presence,
            instance_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::coordinator::test_support::{RecordingUserStore, StaticDirectory};
    use super::*;
    use arena_cache::{MemoryBus, MemoryStore};

    #[test]
    fn test_builder_requires_dependencies() {
        let result = ServiceContextBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_wires_context() {
        let ctx = ServiceContextBuilder::new()
            .store(Arc::new(MemoryStore::new()))
            .users(Arc::new(RecordingUserStore::default()))
            .channels(Arc::new(StaticDirectory::default()))
            .bus(Arc::new(MemoryBus::default()))
            .jwt(Arc::new(JwtService::new("test-secret", 900)))
            .instance_id("gw-7")
            .build()
            .unwrap();

        assert_eq!(ctx.instance_id(), "gw-7");
        assert_eq!(ctx.presence().heartbeat_ttl, 120);
        assert!(!ctx.reconciler().is_running());
    }
}
