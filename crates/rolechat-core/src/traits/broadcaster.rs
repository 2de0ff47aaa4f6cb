//! Outbound realtime port

use async_trait::async_trait;

use crate::error::DomainError;
use crate::events::{BroadcastScope, RealtimeEvent};

/// Delivers realtime events to every subscriber of a scope.
///
/// Delivery is best effort. Callers that already committed state treat a
/// failure here as a log line, not as a failed operation.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, scope: &BroadcastScope, event: &RealtimeEvent) -> Result<(), DomainError>;
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBroadcaster;

#[async_trait]
impl Broadcaster for NoopBroadcaster {
    async fn publish(&self, _scope: &BroadcastScope, _event: &RealtimeEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
