//! Presence service
//!
//! Tracks `is_online`/`last_seen` and announces transitions to every
//! connected client as `user_status_changed`.

use rolechat_core::events::UserStatusPayload;
use rolechat_core::{BroadcastScope, DomainError, EventKind, RealtimeEvent, Snowflake, User};
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// How a presence signal is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Announce {
    /// Always publish (login, logout, connect, disconnect)
    Always,
    /// Publish only if `is_online` flipped (heartbeats, activity)
    OnChange,
}

pub struct PresenceService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PresenceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self))]
    pub async fn set_online(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.record(user_id, true, Announce::Always).await
    }

    #[instrument(skip(self))]
    pub async fn set_offline(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.record(user_id, false, Announce::Always).await
    }

    /// Refresh `last_seen`; brings an offline user back online
    #[instrument(skip(self))]
    pub async fn heartbeat(&self, user_id: Snowflake) -> ServiceResult<User> {
        self.record(user_id, true, Announce::OnChange).await
    }

    /// Mark online users silent for longer than the grace period as offline.
    /// Returns the ids that were expired.
    #[instrument(skip(self))]
    pub async fn expire_stale(&self) -> ServiceResult<Vec<Snowflake>> {
        let now = self.ctx.clock().now();
        let grace = self.ctx.settings().presence_grace;
        let stale = self.ctx.user_repo().find_stale_online(now - grace).await?;

        let mut expired = Vec::with_capacity(stale.len());
        for user in stale {
            // Re-check: a heartbeat may have landed since the scan
            let current = self.ctx.user_repo().find_by_id(user.id).await?;
            if !current.is_some_and(|u| u.is_stale(now, grace)) {
                continue;
            }
            match self.record(user.id, false, Announce::Always).await {
                Ok(_) => expired.push(user.id),
                Err(e) => warn!(user_id = %user.id, error = %e, "Failed to expire presence"),
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired stale presence");
        }
        Ok(expired)
    }

    async fn record(&self, user_id: Snowflake, online: bool, announce: Announce) -> ServiceResult<User> {
        let repo = self.ctx.user_repo();
        let was_online = repo
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?
            .is_online;

        let user = repo
            .set_presence(user_id, online, self.ctx.clock().now())
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let flipped = was_online != online;
        debug!(user_id = %user_id, online, flipped, "Presence recorded");

        if flipped || announce == Announce::Always {
            self.announce(&user).await;
        }
        Ok(user)
    }

    async fn announce(&self, user: &User) {
        let payload = UserStatusPayload {
            user_id: user.id,
            is_online: user.is_online,
            last_seen: user.last_seen,
        };
        match RealtimeEvent::from_payload(EventKind::UserStatusChanged, &payload) {
            Ok(event) => self.ctx.publish(BroadcastScope::All, event).await,
            Err(e) => warn!(user_id = %user.id, error = %e, "Failed to encode status event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use chrono::Duration;
    use rolechat_core::Role;

    #[tokio::test]
    async fn test_transitions_publish_to_everyone() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let presence = PresenceService::new(&harness.ctx);

        let online = presence.set_online(alice.id).await.unwrap();
        assert!(online.is_online);
        let offline = presence.set_offline(alice.id).await.unwrap();
        assert!(!offline.is_online);

        let events = harness.broadcaster.events_named("user_status_changed");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, BroadcastScope::All);
        assert_eq!(events[0].1.data["is_online"], true);
        assert_eq!(events[1].1.data["is_online"], false);
    }

    #[tokio::test]
    async fn test_heartbeat_publishes_only_on_flip() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let presence = PresenceService::new(&harness.ctx);

        presence.heartbeat(alice.id).await.unwrap();
        presence.heartbeat(alice.id).await.unwrap();
        presence.heartbeat(alice.id).await.unwrap();

        assert_eq!(harness.broadcaster.events_named("user_status_changed").len(), 1);
    }

    #[tokio::test]
    async fn test_last_seen_advances() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let presence = PresenceService::new(&harness.ctx);

        let first = presence.set_online(alice.id).await.unwrap();
        harness.clock.advance(Duration::seconds(30));
        let second = presence.heartbeat(alice.id).await.unwrap();
        assert_eq!(second.last_seen - first.last_seen, Duration::seconds(30));
    }

    #[tokio::test]
    async fn test_expire_stale() {
        let harness = TestHarness::new();
        let alice = harness.user("Alice", Role::Student).await;
        let bob = harness.user("Bob", Role::Student).await;
        let presence = PresenceService::new(&harness.ctx);

        presence.set_online(alice.id).await.unwrap();
        harness.clock.advance(Duration::seconds(60));
        presence.set_online(bob.id).await.unwrap();
        harness.clock.advance(Duration::seconds(45));

        let expired = presence.expire_stale().await.unwrap();
        assert_eq!(expired, vec![alice.id]);

        let alice = harness.ctx.user_repo().find_by_id(alice.id).await.unwrap().unwrap();
        let bob = harness.ctx.user_repo().find_by_id(bob.id).await.unwrap().unwrap();
        assert!(!alice.is_online);
        assert!(bob.is_online);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let harness = TestHarness::new();
        let err = PresenceService::new(&harness.ctx)
            .set_online(Snowflake::new(404))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
