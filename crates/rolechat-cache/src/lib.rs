//! # rolechat-cache
//!
//! Redis layer for cross-instance realtime fan-out and connection tracking.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Pub/Sub**: [`RedisBroadcaster`] publishes realtime events, [`Subscriber`]
//!   receives them on every gateway instance
//! - **Presence**: Live connection registry per user
//!
//! ## Example
//!
//! ```ignore
//! use rolechat_cache::{RedisBroadcaster, RedisPool, RedisPoolConfig};
//! use rolechat_core::traits::Broadcaster;
//!
//! let pool = RedisPool::new(RedisPoolConfig::default())?;
//! let broadcaster = RedisBroadcaster::new(pool);
//! broadcaster.publish(&BroadcastScope::Conversation(id), &event).await?;
//! ```

pub mod pool;
pub mod presence;
pub mod pubsub;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export presence types
pub use presence::ConnectionRegistry;

// Re-export pubsub types
pub use pubsub::{
    PubSubChannel, Publisher, ReceivedEvent, RedisBroadcaster, Subscriber, SubscriberConfig,
    SubscriberError, SubscriberResult, CHANNEL_NAMESPACE, CHANNEL_PATTERN,
};
