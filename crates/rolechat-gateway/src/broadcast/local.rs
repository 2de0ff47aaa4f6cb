//! Delivery to this instance's connections only, skipping Redis

use super::deliver;
use crate::connection::ConnectionManager;
use async_trait::async_trait;
use rolechat_cache::ReceivedEvent;
use rolechat_core::{BroadcastScope, Broadcaster, DomainError, RealtimeEvent};
use std::sync::Arc;

/// Publishes straight into the local rooms
#[derive(Debug, Clone)]
pub struct LocalBroadcaster {
    manager: Arc<ConnectionManager>,
}

impl LocalBroadcaster {
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Broadcaster for LocalBroadcaster {
    async fn publish(&self, scope: &BroadcastScope, event: &RealtimeEvent) -> Result<(), DomainError> {
        let received = ReceivedEvent {
            scope: *scope,
            event: event.clone(),
        };
        deliver(&self.manager, &received).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_common::Identity;
    use rolechat_core::{Collection, EventKind, Role, Snowflake};
    use serde_json::json;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_publish_reaches_local_rooms() {
        let manager = ConnectionManager::new_shared();
        let (tx, mut rx) = mpsc::channel(10);
        manager.add_connection("s".to_string(), tx);
        manager.authenticate_connection(
            "s",
            Identity {
                id: Snowflake::new(3),
                role: Role::Teacher,
            },
        );

        let local = LocalBroadcaster::new(manager.clone());
        local
            .publish(
                &BroadcastScope::User(Snowflake::new(3)),
                &RealtimeEvent::new(EventKind::Change(Collection::Groups), json!({"id": "1"})),
            )
            .await
            .unwrap();
        local
            .publish(
                &BroadcastScope::User(Snowflake::new(4)),
                &RealtimeEvent::new(EventKind::Change(Collection::Groups), json!({"id": "2"})),
            )
            .await
            .unwrap();

        assert_eq!(rx.try_recv().unwrap().t.as_deref(), Some("group_change"));
        assert!(rx.try_recv().is_err());
    }
}
