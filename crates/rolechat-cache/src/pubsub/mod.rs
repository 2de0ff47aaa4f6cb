//! Redis Pub/Sub module.
//!
//! Cross-instance fan-out of realtime events.

mod channels;
mod publisher;
mod subscriber;

pub use channels::{PubSubChannel, CHANNEL_NAMESPACE, CHANNEL_PATTERN};
pub use publisher::{Publisher, RedisBroadcaster};
pub use subscriber::{
    ReceivedEvent, Subscriber, SubscriberConfig, SubscriberError, SubscriberResult,
};
