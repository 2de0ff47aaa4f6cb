//! Live connection registry in Redis.
//!
//! Gateway instances register every authenticated socket under its user, so
//! "last connection closed" can be decided across instances.

use crate::pool::{RedisPool, RedisResult};
use redis::AsyncCommands;
use rolechat_core::Snowflake;

/// Key prefix for a user's live connection set
const CONNECTIONS_PREFIX: &str = "presence:connections:";

/// Connection set TTL, refreshed on every heartbeat. Sets of crashed
/// instances expire on their own.
pub const CONNECTIONS_TTL: u64 = 120;

/// Per-user registry of live connection ids
#[derive(Clone, Debug)]
pub struct ConnectionRegistry {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            ttl_seconds: CONNECTIONS_TTL,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    fn key(user_id: Snowflake) -> String {
        format!("{CONNECTIONS_PREFIX}{user_id}")
    }

    /// Register a connection; returns the user's live connection count
    pub async fn register(&self, user_id: Snowflake, connection_id: &str) -> RedisResult<usize> {
        let key = Self::key(user_id);
        let mut conn = self.pool.get().await?;

        let (count,): (usize,) = redis::pipe()
            .atomic()
            .sadd(&key, connection_id)
            .ignore()
            .expire(&key, self.ttl_seconds as i64)
            .ignore()
            .scard(&key)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(user_id = %user_id, connection_id, count, "Connection registered");
        Ok(count)
    }

    /// Keep the user's set alive
    pub async fn refresh(&self, user_id: Snowflake) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        conn.expire::<_, ()>(Self::key(user_id), self.ttl_seconds as i64)
            .await?;
        Ok(())
    }

    /// Remove a connection; returns how many remain for the user
    pub async fn unregister(&self, user_id: Snowflake, connection_id: &str) -> RedisResult<usize> {
        let key = Self::key(user_id);
        let mut conn = self.pool.get().await?;

        let (remaining,): (usize,) = redis::pipe()
            .atomic()
            .srem(&key, connection_id)
            .ignore()
            .scard(&key)
            .query_async(&mut conn)
            .await?;

        tracing::debug!(user_id = %user_id, connection_id, remaining, "Connection unregistered");
        Ok(remaining)
    }

    pub async fn count(&self, user_id: Snowflake) -> RedisResult<usize> {
        let mut conn = self.pool.get().await?;
        let count: usize = conn.scard(Self::key(user_id)).await?;
        Ok(count)
    }
}
