//! Event broadcasting
//!
//! Handles distribution of events from Redis Pub/Sub to WebSocket connections.

mod dispatcher;
mod local;

pub use dispatcher::{deliver, EventDispatcher};
pub use local::LocalBroadcaster;
