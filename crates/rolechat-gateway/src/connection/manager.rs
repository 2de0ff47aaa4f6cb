//! Connection manager
//!
//! Tracks every local WebSocket connection and the rooms they joined, using
//! `DashMap` for concurrent access.

use super::Connection;
use crate::protocol::GatewayMessage;
use dashmap::DashMap;
use rolechat_common::Identity;
use rolechat_core::{BroadcastScope, Snowflake};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// What a removed connection leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub identity: Identity,
    /// Other local connections of the same user
    pub remaining_local: usize,
}

/// Manages all active WebSocket connections of this gateway instance
pub struct ConnectionManager {
    /// Active connections by session ID
    connections: DashMap<String, Arc<Connection>>,

    /// Session IDs per room. User rooms are joined on `identify`.
    rooms: DashMap<BroadcastScope, HashSet<String>>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            rooms: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new, not yet identified connection
    pub fn add_connection(
        &self,
        session_id: String,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection added");

        connection
    }

    /// Remove a connection and all its room memberships
    pub fn remove_connection(&self, session_id: &str) -> Option<Departure> {
        let (_, connection) = self.connections.remove(session_id)?;

        for scope in connection.rooms() {
            self.rooms.alter(&scope, |_, mut sessions| {
                sessions.remove(session_id);
                sessions
            });
        }
        self.rooms.retain(|_, sessions| !sessions.is_empty());

        tracing::debug!(session_id = %session_id, "Connection removed");

        let identity = connection.identity()?;
        Some(Departure {
            identity,
            remaining_local: self.local_connections_of(identity.id),
        })
    }

    pub fn get_connection(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Bind a connection to its caller and join the caller's user room
    pub fn authenticate_connection(&self, session_id: &str, identity: Identity) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        connection.bind(identity);
        self.join_room(session_id, BroadcastScope::User(identity.id));

        tracing::debug!(
            session_id = %session_id,
            user_id = %identity.id,
            "Connection authenticated"
        );
        true
    }

    pub fn join_room(&self, session_id: &str, scope: BroadcastScope) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        connection.join(scope);
        self.rooms
            .entry(scope)
            .or_default()
            .insert(session_id.to_string());

        tracing::trace!(session_id = %session_id, room = %scope, "Joined room");
        true
    }

    pub fn leave_room(&self, session_id: &str, scope: BroadcastScope) -> bool {
        let Some(connection) = self.get_connection(session_id) else {
            return false;
        };
        connection.leave(scope);

        self.rooms.alter(&scope, |_, mut sessions| {
            sessions.remove(session_id);
            sessions
        });
        self.rooms.remove_if(&scope, |_, sessions| sessions.is_empty());

        tracing::trace!(session_id = %session_id, room = %scope, "Left room");
        true
    }

    /// Drop the sessions of `user_id` from a group or conversation room, or
    /// every session when `user_id` is `None`. Returns how many left.
    pub fn evict(&self, scope: BroadcastScope, user_id: Option<Snowflake>) -> usize {
        if !matches!(
            scope,
            BroadcastScope::Conversation(_) | BroadcastScope::Group(_)
        ) {
            return 0;
        }

        let evicted: Vec<Arc<Connection>> = self
            .room_connections(scope)
            .into_iter()
            .filter(|conn| user_id.is_none_or(|id| conn.user_id() == Some(id)))
            .collect();
        for conn in &evicted {
            self.leave_room(conn.session_id(), scope);
        }

        if !evicted.is_empty() {
            tracing::debug!(room = %scope, evicted = evicted.len(), "Room access revoked");
        }
        evicted.len()
    }

    /// Connections in a room. [`BroadcastScope::All`] means every identified
    /// connection.
    pub fn room_connections(&self, scope: BroadcastScope) -> Vec<Arc<Connection>> {
        if scope == BroadcastScope::All {
            return self
                .connections
                .iter()
                .filter(|entry| entry.value().is_identified())
                .map(|entry| entry.value().clone())
                .collect();
        }

        self.rooms
            .get(&scope)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Send to every connection in a room, skipping the connections of
    /// `exclude_user`. Returns how many connections accepted the frame.
    pub async fn send_to_room(
        &self,
        scope: BroadcastScope,
        message: GatewayMessage,
        exclude_user: Option<Snowflake>,
    ) -> usize {
        let mut sent = 0;

        for conn in self.room_connections(scope) {
            if let Some(exclude) = exclude_user {
                if conn.user_id() == Some(exclude) {
                    continue;
                }
            }

            if conn.send(message.clone()).await.is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(room = %scope, sent = sent, "Message sent to room");

        sent
    }

    /// Number of local connections identified as `user_id`
    pub fn local_connections_of(&self, user_id: Snowflake) -> usize {
        self.rooms
            .get(&BroadcastScope::User(user_id))
            .map_or(0, |sessions| sessions.len())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.connections.contains_key(session_id)
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
