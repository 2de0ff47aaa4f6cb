//! Redis Pub/Sub publisher.
//!
//! Publishes realtime events for every gateway instance to fan out.

use async_trait::async_trait;
use redis::AsyncCommands;
use rolechat_core::events::{BroadcastScope, RealtimeEvent};
use rolechat_core::traits::Broadcaster;
use rolechat_core::DomainError;

use crate::pool::{RedisPool, RedisResult};
use crate::pubsub::PubSubChannel;

/// Redis Pub/Sub publisher
#[derive(Clone, Debug)]
pub struct Publisher {
    pool: RedisPool,
}

impl Publisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event to a channel, returning how many subscribers got it
    pub async fn publish(&self, channel: &PubSubChannel, event: &RealtimeEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = channel.name();
        let payload = serde_json::to_string(event)?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event = %event.name(),
            receivers = receivers,
            "Published event"
        );

        Ok(receivers)
    }

    /// Publish one event to several channels over a single connection
    pub async fn publish_many(
        &self,
        channels: &[PubSubChannel],
        event: &RealtimeEvent,
    ) -> RedisResult<u32> {
        let payload = serde_json::to_string(event)?;
        let mut total_receivers = 0;
        let mut conn = self.pool.get().await?;

        for channel in channels {
            let receivers: u32 = conn.publish(channel.name(), &payload).await?;
            total_receivers += receivers;
        }

        tracing::debug!(
            channels = channels.len(),
            event = %event.name(),
            total_receivers = total_receivers,
            "Published event to multiple channels"
        );

        Ok(total_receivers)
    }
}

/// [`Broadcaster`] backed by Redis Pub/Sub
#[derive(Clone, Debug)]
pub struct RedisBroadcaster {
    publisher: Publisher,
}

impl RedisBroadcaster {
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            publisher: Publisher::new(pool),
        }
    }

    #[must_use]
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }
}

#[async_trait]
impl Broadcaster for RedisBroadcaster {
    async fn publish(&self, scope: &BroadcastScope, event: &RealtimeEvent) -> Result<(), DomainError> {
        self.publisher
            .publish(&PubSubChannel::new(*scope), event)
            .await
            .map(|_| ())
            .map_err(|e| DomainError::TransportError(e.to_string()))
    }
}
