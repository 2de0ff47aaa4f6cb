//! Gateway server setup
//!
//! Wires the WebSocket route to the connection manager, the Redis event
//! dispatcher, the database change feed and the presence sweeper.
//!
//! Every gateway node hears every change notification, so the bridge
//! delivers `*_change` events to local sockets only and never republishes
//! them through Redis.

mod handler;
mod state;
mod tasks;

pub use handler::gateway_handler;
pub use state::GatewayState;
pub use tasks::spawn_presence_sweeper;

use crate::broadcast::{EventDispatcher, LocalBroadcaster};
use crate::connection::ConnectionManager;
use axum::{routing::get, Json, Router};
use rolechat_cache::{
    ConnectionRegistry, RedisBroadcaster, RedisPool, RedisPoolConfig, SubscriberConfig,
};
use rolechat_common::{AppConfig, AppError, JwtService};
use rolechat_core::SnowflakeGenerator;
use rolechat_db::{create_pool, ChangeFeed, ChangeFeedConfig, PgPool};
use rolechat_service::{ChangeFeedBridge, ServiceContextBuilder, ServiceSettings};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<GatewayState>,
) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "connections": state.connection_manager().connection_count(),
    }))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Everything `run` needs besides the state itself
struct Infra {
    pool: PgPool,
    redis_url: String,
}

/// Connect PostgreSQL and Redis and build the [`GatewayState`]
async fn create_gateway_state(config: &AppConfig) -> Result<(GatewayState, Infra), AppError> {
    tracing::info!("Connecting to PostgreSQL...");
    let pool = create_pool(&rolechat_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    tracing::info!("Connecting to Redis...");
    let redis = RedisPool::new(RedisPoolConfig::from(&config.redis))
        .map_err(|e| AppError::Cache(e.to_string()))?;
    tracing::info!("Redis pool created");

    let service_context = ServiceContextBuilder::new()
        .postgres(&pool)
        .broadcaster(Arc::new(RedisBroadcaster::new(redis.clone())))
        .jwt_service(Arc::new(JwtService::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry,
        )))
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)))
        .settings(ServiceSettings::from_config(config)?)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let state = GatewayState::new(
        service_context,
        ConnectionManager::new_shared(),
        config.realtime.clone(),
    )
    .with_registry(ConnectionRegistry::new(redis));

    Ok((
        state,
        Infra {
            pool,
            redis_url: config.redis.url.clone(),
        },
    ))
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let (state, infra) = create_gateway_state(&config).await?;

    let dispatcher = EventDispatcher::start(
        SubscriberConfig::for_url(infra.redis_url),
        Arc::clone(state.connection_manager_shared()),
    );

    let sweeper = spawn_presence_sweeper(
        state.service_context().clone(),
        config.realtime.sweep_interval(),
    );
    let local = LocalBroadcaster::new(Arc::clone(state.connection_manager_shared()));
    let change_feed = ChangeFeedBridge::new(state.service_context().with_broadcaster(Arc::new(local)))
        .spawn(ChangeFeed::spawn(infra.pool, ChangeFeedConfig::default()).into_stream());

    let addr = config.gateway.address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    let served = axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")));

    sweeper.abort();
    change_feed.abort();
    dispatcher.stop();
    tracing::info!("Gateway stopped");
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
