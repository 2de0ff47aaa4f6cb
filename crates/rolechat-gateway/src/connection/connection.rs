//! One client socket as the gateway sees it
//!
//! The socket's mutable session data sits behind a single `parking_lot`
//! mutex; no lock is ever held across an await.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rolechat_common::Identity;
use rolechat_core::{BroadcastScope, Snowflake};
use tokio::sync::mpsc;

use crate::protocol::GatewayMessage;

/// Where a socket is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgraded, `identify` not yet accepted
    AwaitingIdentify,
    Identified,
    Closed,
}

#[derive(Debug)]
struct Session {
    state: ConnectionState,
    identity: Option<Identity>,
    /// Includes the caller's own user room once identified
    rooms: HashSet<BroadcastScope>,
    last_heartbeat: Instant,
}

pub struct Connection {
    session_id: String,
    outbox: mpsc::Sender<GatewayMessage>,
    session: Mutex<Session>,
}

impl Connection {
    #[must_use]
    pub fn new(session_id: String, outbox: mpsc::Sender<GatewayMessage>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            outbox,
            session: Mutex::new(Session {
                state: ConnectionState::AwaitingIdentify,
                identity: None,
                rooms: HashSet::new(),
                last_heartbeat: Instant::now(),
            }),
        })
    }

    #[must_use]
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> ConnectionState {
        self.session.lock().state
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.lock().identity
    }

    pub fn user_id(&self) -> Option<Snowflake> {
        self.identity().map(|identity| identity.id)
    }

    pub fn is_identified(&self) -> bool {
        self.session.lock().identity.is_some()
    }

    /// Attach the caller and mark the socket identified
    pub fn bind(&self, identity: Identity) {
        let mut session = self.session.lock();
        session.identity = Some(identity);
        session.state = ConnectionState::Identified;
    }

    pub fn mark_closed(&self) {
        self.session.lock().state = ConnectionState::Closed;
    }

    pub fn record_heartbeat(&self) {
        self.session.lock().last_heartbeat = Instant::now();
    }

    pub fn silent_for(&self) -> Duration {
        self.session.lock().last_heartbeat.elapsed()
    }

    /// `false` if already joined
    pub fn join(&self, scope: BroadcastScope) -> bool {
        self.session.lock().rooms.insert(scope)
    }

    /// `false` if not joined
    pub fn leave(&self, scope: BroadcastScope) -> bool {
        self.session.lock().rooms.remove(&scope)
    }

    pub fn rooms(&self) -> Vec<BroadcastScope> {
        self.session.lock().rooms.iter().copied().collect()
    }

    pub fn is_in(&self, scope: BroadcastScope) -> bool {
        self.session.lock().rooms.contains(&scope)
    }

    /// Queue a frame for the socket's writer task
    pub async fn send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::SendError<GatewayMessage>> {
        self.outbox.send(message).await
    }

    /// The writer task is gone
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.lock();
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("state", &session.state)
            .field("user_id", &session.identity.map(|identity| identity.id))
            .field("rooms", &session.rooms.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolechat_core::Role;

    fn open() -> (Arc<Connection>, mpsc::Receiver<GatewayMessage>) {
        let (tx, rx) = mpsc::channel(4);
        (Connection::new("s-1".to_string(), tx), rx)
    }

    #[test]
    fn test_new_connection_awaits_identify() {
        let (conn, _rx) = open();

        assert_eq!(conn.session_id(), "s-1");
        assert_eq!(conn.state(), ConnectionState::AwaitingIdentify);
        assert!(!conn.is_identified());
        assert_eq!(conn.user_id(), None);
    }

    #[test]
    fn test_bind_identifies() {
        let (conn, _rx) = open();
        conn.bind(Identity {
            id: Snowflake::new(12345),
            role: Role::Student,
        });

        assert!(conn.is_identified());
        assert_eq!(conn.state(), ConnectionState::Identified);
        assert_eq!(conn.user_id(), Some(Snowflake::new(12345)));
        assert_eq!(conn.identity().map(|identity| identity.role), Some(Role::Student));

        conn.mark_closed();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_rooms() {
        let (conn, _rx) = open();
        let conversation = BroadcastScope::Conversation(Snowflake::new(1));
        let group = BroadcastScope::Group(Snowflake::new(2));

        assert!(conn.join(conversation));
        assert!(!conn.join(conversation));
        assert!(conn.join(group));
        assert_eq!(conn.rooms().len(), 2);

        assert!(conn.leave(conversation));
        assert!(!conn.leave(conversation));
        assert!(!conn.is_in(conversation));
        assert!(conn.is_in(group));
    }

    #[test]
    fn test_heartbeat_resets_silence() {
        let (conn, _rx) = open();
        std::thread::sleep(Duration::from_millis(20));
        assert!(conn.silent_for() >= Duration::from_millis(20));

        conn.record_heartbeat();
        assert!(conn.silent_for() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_send_after_writer_dropped() {
        let (conn, rx) = open();
        drop(rx);

        assert!(conn.is_closed());
        assert!(conn.send(GatewayMessage::heartbeat_ack()).await.is_err());
    }
}
