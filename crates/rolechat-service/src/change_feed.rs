//! One-way bridge from the persistence change feed to the broadcaster
//!
//! Every row change becomes a `<collection>_change` event. Changes to the
//! permission tables also drop the cached permission snapshot, including
//! changes made by other nodes. Processes without sockets run the bridge
//! in invalidate-only mode.

use futures_util::{Stream, StreamExt};
use rolechat_core::{BroadcastScope, ChangeEvent, Collection, EventKind, RealtimeEvent, Snowflake};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::ServiceContext;

/// Rooms that receive a change.
///
/// Message changes go to their conversation or group, conversation changes
/// to both participants, group changes to the group. Everything else
/// (users, permission tables) is visible to everyone.
pub fn scopes_for(change: &ChangeEvent) -> Vec<BroadcastScope> {
    let doc = &change.document;
    match change.collection {
        Collection::Messages => {
            if let Some(id) = snowflake_field(doc, "conversation_id") {
                vec![BroadcastScope::Conversation(id)]
            } else if let Some(id) = snowflake_field(doc, "group_id") {
                vec![BroadcastScope::Group(id)]
            } else {
                Vec::new()
            }
        }
        Collection::Conversations => ["participant_1", "participant_2"]
            .into_iter()
            .filter_map(|field| snowflake_field(doc, field))
            .map(BroadcastScope::User)
            .collect(),
        Collection::Groups => change
            .id
            .as_deref()
            .and_then(|id| Snowflake::parse(id).ok())
            .or_else(|| snowflake_field(doc, "id"))
            .map(BroadcastScope::Group)
            .into_iter()
            .collect(),
        Collection::Users
        | Collection::ChatPermissions
        | Collection::RoleSettings
        | Collection::RoleCapabilities => vec![BroadcastScope::All],
    }
}

/// BIGINT columns arrive as JSON numbers; accept strings too
fn snowflake_field(doc: &Value, field: &str) -> Option<Snowflake> {
    match doc.get(field)? {
        Value::Number(n) => n.as_i64().map(Snowflake::new),
        Value::String(s) => Snowflake::parse(s).ok(),
        _ => None,
    }
}

/// Applies change events to a [`ServiceContext`]
#[derive(Clone)]
pub struct ChangeFeedBridge {
    ctx: ServiceContext,
    relay: bool,
}

impl ChangeFeedBridge {
    /// Invalidates and publishes every change through `ctx`'s broadcaster
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx, relay: true }
    }

    /// Only drops stale permission snapshots; nothing is published
    pub fn invalidate_only(ctx: ServiceContext) -> Self {
        Self { ctx, relay: false }
    }

    pub async fn handle(&self, change: ChangeEvent) {
        if change.collection.affects_permissions() {
            self.ctx.permission_cache().invalidate();
            debug!(collection = change.collection.as_str(), "Permission snapshot invalidated by change feed");
        }
        if !self.relay {
            return;
        }

        let scopes = scopes_for(&change);
        if scopes.is_empty() {
            warn!(collection = change.collection.as_str(), id = ?change.id, "Change without a routable scope");
            return;
        }

        let event = match serde_json::to_value(&change) {
            Ok(data) => RealtimeEvent::new(EventKind::Change(change.collection), data),
            Err(e) => {
                warn!(error = %e, "Failed to encode change event");
                return;
            }
        };
        for scope in scopes {
            self.ctx.publish(scope, event.clone()).await;
        }
    }

    /// Drain `changes` until it ends
    pub async fn run<S>(self, changes: S)
    where
        S: Stream<Item = ChangeEvent> + Send,
    {
        info!("Change feed bridge started");
        let mut changes = std::pin::pin!(changes);
        while let Some(change) = changes.next().await {
            self.handle(change).await;
        }
        info!("Change feed bridge stopped");
    }

    pub fn spawn<S>(self, changes: S) -> JoinHandle<()>
    where
        S: Stream<Item = ChangeEvent> + Send + 'static,
    {
        tokio::spawn(self.run(changes))
    }
}

impl std::fmt::Debug for ChangeFeedBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeedBridge")
            .field("relay", &self.relay)
            .finish_non_exhaustive()
    }
}
