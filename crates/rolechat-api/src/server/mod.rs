//! Server setup and initialization
//!
//! Connects PostgreSQL and Redis, builds the [`ServiceContext`] and serves
//! the router with peer addresses attached for the rate limiter. A change
//! feed listener keeps the permission snapshot fresh when other processes
//! edit the permission tables.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use rolechat_cache::{RedisBroadcaster, RedisPool, RedisPoolConfig};
use rolechat_common::{AppConfig, AppError, JwtService};
use rolechat_core::SnowflakeGenerator;
use rolechat_db::{create_pool, run_migrations, ChangeFeed, ChangeFeedConfig};
use rolechat_service::{ChangeFeedBridge, ServiceContextBuilder, ServiceSettings};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::middleware::{apply_middleware, rate_limited};
use crate::routes::{create_router, health_routes};
use crate::state::{AppState, Infra};

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState, config: &AppConfig) -> Result<Router, AppError> {
    let api = rate_limited(create_router(), &config.rate_limit)?;
    let router = api.merge(health_routes());
    let router = apply_middleware(router, &config.cors, config.app.env.is_production());
    Ok(router.with_state(state))
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: &AppConfig) -> Result<AppState, AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&rolechat_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    info!("Connecting to Redis...");
    let redis = RedisPool::new(RedisPoolConfig::from(&config.redis))
        .map_err(|e| AppError::Cache(e.to_string()))?;
    info!("Redis pool created");

    let jwt_service = Arc::new(JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expiry,
    ));
    let snowflake_generator = Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id));

    let service_context = ServiceContextBuilder::new()
        .postgres(&pool)
        .broadcaster(Arc::new(RedisBroadcaster::new(redis.clone())))
        .jwt_service(jwt_service)
        .snowflake_generator(snowflake_generator)
        .settings(ServiceSettings::from_config(config)?)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    Ok(AppState::new(service_context, Infra { pool, redis }))
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!(address = %addr, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Invalidate the permission snapshot on permission-table changes.
/// Realtime relaying stays with the gateway.
pub fn spawn_permission_invalidator(state: &AppState) -> Option<JoinHandle<()>> {
    let infra = state.infra()?;
    let changes = ChangeFeed::spawn(infra.pool.clone(), ChangeFeedConfig::default());
    Some(
        ChangeFeedBridge::invalidate_only(state.service_context().clone())
            .spawn(changes.into_stream()),
    )
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let state = create_app_state(&config).await?;
    let invalidator = spawn_permission_invalidator(&state);
    let app = create_app(state, &config)?;
    let served = run_server(app, &config.api.address()).await;

    if let Some(task) = invalidator {
        task.abort();
    }
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_service::testing::TestHarness;

    #[tokio::test]
    async fn test_no_invalidator_without_a_database() {
        let harness = TestHarness::new();
        let state = AppState::detached(harness.ctx.clone());
        assert!(spawn_permission_invalidator(&state).is_none());
    }
}
