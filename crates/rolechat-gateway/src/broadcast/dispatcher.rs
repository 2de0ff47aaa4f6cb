//! Event dispatcher
//!
//! Receives events from Redis Pub/Sub and delivers them to the local
//! connections that joined the event's room.

use crate::connection::ConnectionManager;
use crate::protocol::GatewayMessage;
use rolechat_cache::{ReceivedEvent, Subscriber, SubscriberConfig};
use rolechat_core::{EventKind, RealtimeEvent, Snowflake};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Typing indicators never echo back to the typist
fn excluded_user(event: &RealtimeEvent) -> Option<Snowflake> {
    match event.kind {
        EventKind::UserTyping | EventKind::UserStoppedTyping => event
            .data
            .get("userId")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
        _ => None,
    }
}

/// Whose sessions a revocation removes from the room; `Some(None)` is everyone
fn revoked_user(event: &RealtimeEvent) -> Option<Option<Snowflake>> {
    if event.kind != EventKind::RoomAccessRevoked {
        return None;
    }
    Some(
        event
            .data
            .get("userId")
            .and_then(|v| serde_json::from_value(v.clone()).ok()),
    )
}

/// Deliver one received event to its room on this instance.
/// Returns the number of connections reached.
///
/// A revocation is delivered before the affected sessions leave the room,
/// so they learn why the room went quiet.
pub async fn deliver(manager: &ConnectionManager, received: &ReceivedEvent) -> usize {
    let message = GatewayMessage::event(&received.event);
    let exclude = excluded_user(&received.event);

    let sent = manager
        .send_to_room(received.scope, message, exclude)
        .await;

    if let Some(user_id) = revoked_user(&received.event) {
        manager.evict(received.scope, user_id);
    }

    tracing::trace!(
        room = %received.scope,
        event_type = %received.event.name(),
        sent = sent,
        "Event dispatched"
    );
    sent
}

/// Routes Redis Pub/Sub events to local WebSocket connections
pub struct EventDispatcher {
    subscriber: Subscriber,
    delivery: JoinHandle<()>,
}

impl EventDispatcher {
    /// Start the subscriber and the delivery loop
    #[must_use]
    pub fn start(config: SubscriberConfig, connection_manager: Arc<ConnectionManager>) -> Self {
        let subscriber = Subscriber::spawn(config);
        let delivery = tokio::spawn(run(subscriber.events(), connection_manager));
        tracing::info!("Event dispatcher started");

        Self {
            subscriber,
            delivery,
        }
    }

    pub fn stop(self) {
        if let Err(e) = self.subscriber.stop() {
            tracing::debug!(error = %e, "Subscriber already stopped");
        }
        self.delivery.abort();
        tracing::info!("Event dispatcher stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.delivery.is_finished()
    }
}

async fn run(mut events: broadcast::Receiver<ReceivedEvent>, manager: Arc<ConnectionManager>) {
    loop {
        match events.recv().await {
            Ok(received) => {
                deliver(&manager, &received).await;
            }
            Err(RecvError::Lagged(n)) => {
                // At-most-once: skipped events are not replayed
                tracing::warn!(lagged = n, "Event dispatcher lagged behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::info!("Event dispatcher loop ended");
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscriber", &self.subscriber)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::OpCode;
    use rolechat_common::Identity;
    use rolechat_core::{BroadcastScope, Role};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn identified(
        manager: &ConnectionManager,
        session: &str,
        user: i64,
    ) -> mpsc::Receiver<GatewayMessage> {
        let (tx, rx) = mpsc::channel(10);
        manager.add_connection(session.to_string(), tx);
        manager.authenticate_connection(
            session,
            Identity {
                id: Snowflake::new(user),
                role: Role::Student,
            },
        );
        rx
    }

    #[tokio::test]
    async fn test_deliver_to_joined_room_only() {
        let manager = ConnectionManager::new();
        let mut inside = identified(&manager, "in", 1);
        let mut outside = identified(&manager, "out", 2);
        let room = BroadcastScope::Conversation(Snowflake::new(10));
        manager.join_room("in", room);

        let received = ReceivedEvent {
            scope: room,
            event: RealtimeEvent::new(EventKind::NewMessage, json!({"id": "99"})),
        };
        assert_eq!(deliver(&manager, &received).await, 1);

        let frame = inside.try_recv().unwrap();
        assert_eq!(frame.op, OpCode::Dispatch);
        assert_eq!(frame.t.as_deref(), Some("new_message"));
        assert_eq!(frame.d.unwrap()["id"], "99");
        assert!(outside.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_skips_the_typist() {
        let manager = ConnectionManager::new();
        let mut typist = identified(&manager, "typist", 1);
        let mut reader = identified(&manager, "reader", 2);
        let room = BroadcastScope::Group(Snowflake::new(5));
        manager.join_room("typist", room);
        manager.join_room("reader", room);

        let received = ReceivedEvent {
            scope: room,
            event: RealtimeEvent::new(EventKind::UserTyping, json!({"userId": "1", "groupId": "5"})),
        };
        assert_eq!(deliver(&manager, &received).await, 1);
        assert!(typist.try_recv().is_err());
        assert_eq!(reader.try_recv().unwrap().t.as_deref(), Some("user_typing"));
    }

    #[tokio::test]
    async fn test_revocation_evicts_after_delivery() {
        let manager = ConnectionManager::new();
        let mut leaving = identified(&manager, "leaving", 1);
        let mut staying = identified(&manager, "staying", 2);
        let room = BroadcastScope::Group(Snowflake::new(5));
        manager.join_room("leaving", room);
        manager.join_room("staying", room);

        let received = ReceivedEvent {
            scope: room,
            event: RealtimeEvent::new(
                EventKind::RoomAccessRevoked,
                json!({"userId": "1", "groupId": "5"}),
            ),
        };
        assert_eq!(deliver(&manager, &received).await, 2);
        assert_eq!(leaving.try_recv().unwrap().t.as_deref(), Some("room_access_revoked"));
        assert!(staying.try_recv().is_ok());

        let typing = ReceivedEvent {
            scope: room,
            event: RealtimeEvent::new(EventKind::UserTyping, json!({"userId": "2", "groupId": "5"})),
        };
        assert_eq!(deliver(&manager, &typing).await, 0);
        assert!(leaving.try_recv().is_err());
        assert!(!manager.get_connection("leaving").unwrap().is_in(room));
        assert!(manager.get_connection("staying").unwrap().is_in(room));
    }

    #[tokio::test]
    async fn test_deleted_conversation_empties_the_room() {
        let manager = ConnectionManager::new();
        let _a = identified(&manager, "a", 1);
        let _b = identified(&manager, "b", 2);
        let room = BroadcastScope::Conversation(Snowflake::new(9));
        manager.join_room("a", room);
        manager.join_room("b", room);

        let received = ReceivedEvent {
            scope: room,
            event: RealtimeEvent::new(EventKind::RoomAccessRevoked, json!({"conversationId": "9"})),
        };
        assert_eq!(deliver(&manager, &received).await, 2);
        assert!(manager.room_connections(room).is_empty());
    }

    #[tokio::test]
    async fn test_status_changes_reach_everyone() {
        let manager = ConnectionManager::new();
        let mut a = identified(&manager, "a", 1);
        let mut b = identified(&manager, "b", 2);

        let received = ReceivedEvent {
            scope: BroadcastScope::All,
            event: RealtimeEvent::new(EventKind::UserStatusChanged, json!({"userId": "1"})),
        };
        assert_eq!(deliver(&manager, &received).await, 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_user_room_delivery() {
        let manager = ConnectionManager::new();
        let mut mine = identified(&manager, "mine", 7);
        let mut other = identified(&manager, "other", 8);

        let received = ReceivedEvent {
            scope: BroadcastScope::User(Snowflake::new(7)),
            event: RealtimeEvent::new(
                EventKind::Change(rolechat_core::Collection::Conversations),
                json!({"id": "3"}),
            ),
        };
        assert_eq!(deliver(&manager, &received).await, 1);
        assert_eq!(mine.try_recv().unwrap().t.as_deref(), Some("conversation_change"));
        assert!(other.try_recv().is_err());
    }
}
