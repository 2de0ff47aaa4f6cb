//! Background tasks of the gateway process

use rolechat_service::{PresenceService, ServiceContext};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Periodically mark users offline whose heartbeats stopped without a
/// clean disconnect (crashed clients, killed instances).
pub fn spawn_presence_sweeper(ctx: ServiceContext, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match PresenceService::new(&ctx).expire_stale().await {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(count = expired.len(), "Expired stale presence");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Presence sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use rolechat_core::Role;
    use rolechat_service::testing::TestHarness;

    #[tokio::test]
    async fn test_sweeper_expires_silent_users() {
        let harness = TestHarness::new();
        let user = harness.user("Sarah", Role::Student).await;
        PresenceService::new(&harness.ctx).set_online(user.id).await.unwrap();
        harness.clock.advance(ChronoDuration::minutes(10));

        let task = spawn_presence_sweeper(harness.ctx.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        task.abort();

        let stored = harness.ctx.user_repo().find_by_id(user.id).await.unwrap().unwrap();
        assert!(!stored.is_online);
    }
}
