//! Pattern subscription over every rolechat channel.
//!
//! Parsed events are re-broadcast in-process, where the gateway routes them
//! to its local rooms. The listener reconnects until stopped.

use std::time::Duration;

use futures_util::StreamExt;
use redis::Client;
use rolechat_core::events::{BroadcastScope, RealtimeEvent};
use tokio::sync::{broadcast, watch};

use crate::pubsub::{PubSubChannel, CHANNEL_PATTERN};

#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Subscriber already stopped")]
    Stopped,
}

pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// An event together with the room it was published to
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub scope: BroadcastScope,
    pub event: RealtimeEvent,
}

impl ReceivedEvent {
    /// `None` for channels outside the namespace and for undecodable payloads
    fn from_redis(channel_name: &str, payload: &str) -> Option<Self> {
        let channel = PubSubChannel::parse(channel_name)?;
        match serde_json::from_str(payload) {
            Ok(event) => Some(Self {
                scope: channel.scope(),
                event,
            }),
            Err(e) => {
                tracing::warn!(channel = %channel_name, error = %e, "Dropping malformed event");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub redis_url: String,
    /// Capacity of the in-process fan-out; slow receivers lag past it
    pub buffer: usize,
    pub reconnect_delay: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            buffer: 1024,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl SubscriberConfig {
    #[must_use]
    pub fn for_url(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }
}

/// How one listening session ended
enum Listen {
    Stopped,
    StreamEnded,
}

/// Handle to the background listener
pub struct Subscriber {
    events: broadcast::Sender<ReceivedEvent>,
    stop: watch::Sender<bool>,
}

impl Subscriber {
    /// Start listening in the background
    #[must_use]
    pub fn spawn(config: SubscriberConfig) -> Self {
        let (events, _) = broadcast::channel(config.buffer);
        let (stop, stopped) = watch::channel(false);

        tokio::spawn(run(config, events.clone(), stopped));

        Self { events, stop }
    }

    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ReceivedEvent> {
        self.events.subscribe()
    }

    /// Ask the listener to exit; errors if it is already gone
    pub fn stop(&self) -> SubscriberResult<()> {
        self.stop.send(true).map_err(|_| SubscriberError::Stopped)
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("receivers", &self.events.receiver_count())
            .field("stopped", &*self.stop.borrow())
            .finish()
    }
}

async fn run(
    config: SubscriberConfig,
    events: broadcast::Sender<ReceivedEvent>,
    mut stopped: watch::Receiver<bool>,
) {
    loop {
        match listen(&config, &events, &mut stopped).await {
            Ok(Listen::Stopped) => break,
            Ok(Listen::StreamEnded) => tracing::warn!("Pub/Sub stream ended, reconnecting"),
            Err(e) => tracing::error!(error = %e, "Subscriber error, reconnecting"),
        }

        tokio::select! {
            () = tokio::time::sleep(config.reconnect_delay) => {}
            _ = stopped.changed() => break,
        }
    }
    tracing::info!("Subscriber stopped");
}

async fn listen(
    config: &SubscriberConfig,
    events: &broadcast::Sender<ReceivedEvent>,
    stopped: &mut watch::Receiver<bool>,
) -> SubscriberResult<Listen> {
    let client = Client::open(config.redis_url.as_str())?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(CHANNEL_PATTERN).await?;
    tracing::info!(pattern = CHANNEL_PATTERN, "Subscribed to realtime channels");

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            message = messages.next() => {
                let Some(message) = message else {
                    return Ok(Listen::StreamEnded);
                };
                let channel = message.get_channel_name();
                let payload: String = message.get_payload().unwrap_or_default();
                tracing::trace!(channel = %channel, "Pub/Sub message");

                if let Some(received) = ReceivedEvent::from_redis(channel, &payload) {
                    // No local receivers is fine
                    let _ = events.send(received);
                }
            }
            _ = stopped.changed() => return Ok(Listen::Stopped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_core::events::EventKind;
    use rolechat_core::Snowflake;

    #[test]
    fn test_received_event_parsing() {
        let payload = r#"{"event":"new_message","data":{"id":"9"},"timestamp":"2025-01-01T00:00:00Z"}"#;
        let received = ReceivedEvent::from_redis("rolechat:conversation:12345", payload).unwrap();

        assert_eq!(received.scope, BroadcastScope::Conversation(Snowflake::from(12345i64)));
        assert_eq!(received.event.kind, EventKind::NewMessage);
        assert_eq!(received.event.data["id"], "9");
    }

    #[test]
    fn test_malformed_payload_dropped() {
        assert!(ReceivedEvent::from_redis("rolechat:user:123", "invalid").is_none());
    }

    #[test]
    fn test_foreign_channel_ignored() {
        let payload = r#"{"event":"new_message","data":{},"timestamp":"2025-01-01T00:00:00Z"}"#;
        assert!(ReceivedEvent::from_redis("other:user:123", payload).is_none());
    }

    #[test]
    fn test_config_for_url() {
        let config = SubscriberConfig::for_url("redis://cache:6380");
        assert_eq!(config.redis_url, "redis://cache:6380");
        assert_eq!(config.buffer, 1024);
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_stop_ends_listener_without_server() {
        let subscriber = Subscriber::spawn(SubscriberConfig {
            reconnect_delay: Duration::from_millis(10),
            ..SubscriberConfig::for_url("redis://127.0.0.1:1")
        });
        subscriber.stop().unwrap();

        // The listener task owns the only watch receiver, so `stop` starts
        // failing once the task has exited
        tokio::time::timeout(Duration::from_secs(5), async {
            while subscriber.stop().is_ok() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert!(matches!(subscriber.stop(), Err(SubscriberError::Stopped)));
    }
}
