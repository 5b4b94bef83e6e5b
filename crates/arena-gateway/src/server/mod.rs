//! Gateway server setup
//!
//! Wires dependencies and runs the WebSocket server.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::broadcast::EventDispatcher;
use crate::connection::ConnectionManager;
use arena_cache::{BusChannel, EventBus, RedisEventBus, RedisStore, SubscriberConfig};
use arena_common::{AppConfig, AppError, JwtService};
use arena_service::ServiceContextBuilder;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    // Database pool (durable collaborators)
    tracing::info!("Connecting to PostgreSQL...");
    let db_config = arena_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = arena_db::create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    // Shared store
    tracing::info!("Connecting to Redis...");
    let store = RedisStore::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    store
        .health_check()
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;
    tracing::info!("Redis connection established");

    // Cross-instance event bus; every instance follows the broadcast channel
    let bus: Arc<dyn EventBus> = Arc::new(RedisEventBus::new(
        store.clone(),
        SubscriberConfig {
            redis_url: config.redis.url.clone(),
            ..SubscriberConfig::default()
        },
    ));
    bus.subscribe(&[BusChannel::broadcast()])
        .await
        .map_err(|e| AppError::Cache(e.to_string()))?;

    let jwt = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));

    let context = ServiceContextBuilder::new()
        .store(Arc::new(store))
        .users(Arc::new(arena_db::PgUserStatusRepository::new(pool.clone())))
        .channels(Arc::new(arena_db::PgChannelDirectory::new(pool)))
        .bus(bus.clone())
        .jwt(jwt)
        .presence(config.presence)
        .instance_id(config.app.instance_id.clone())
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let connection_manager = ConnectionManager::new_shared();

    let event_dispatcher = Arc::new(EventDispatcher::new(bus, connection_manager.clone()));
    event_dispatcher.clone().start();

    // Scheduled reconciliation; every instance runs its own sweeps
    context.reconciler().clone().start();

    Ok(GatewayState::new(
        context,
        connection_manager,
        event_dispatcher,
        config,
    ))
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.gateway.port));

    let state = create_gateway_state(config).await?;
    let app = create_app(state);

    run_server(app, addr).await
}
