//! Pooled Redis connections shared by the broadcaster and the connection registry.

use std::time::{Duration, Instant};

use deadpool_redis::{Config, Connection, Pool, Runtime};

/// Pool settings
#[derive(Debug, Clone)]
pub struct RedisPoolConfig {
    /// `redis://[user:pass@]host:port[/db]`
    pub url: String,
    pub max_connections: usize,
}

impl Default for RedisPoolConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            max_connections: 16,
        }
    }
}

impl From<&rolechat_common::RedisConfig> for RedisPoolConfig {
    fn from(config: &rolechat_common::RedisConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections as usize,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("No Redis connection available: {0}")]
    GetConnection(#[from] deadpool_redis::PoolError),

    #[error("Redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Event encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Host part of a Redis URL, without credentials
fn redact(url: &str) -> &str {
    url.rsplit('@').next().unwrap_or(url)
}

/// Cloneable handle to the pool
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
    host: String,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisPool")
            .field("host", &self.host)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}

impl RedisPool {
    /// Build the pool; no connection is opened until first use
    pub fn new(config: RedisPoolConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        let host = redact(&config.url).to_string();
        tracing::info!(host = %host, max_connections = config.max_connections, "Redis pool created");

        Ok(Self { pool, host })
    }

    pub async fn get(&self) -> RedisResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// `PING` round trip, used by the readiness probe
    pub async fn health_check(&self) -> RedisResult<Duration> {
        let started = Instant::now();
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(started.elapsed())
    }
}
