//! Quota service
//!
//! Daily usage is counted from persisted messages; nothing is stored.

use rolechat_core::quota::local_start_of_day;
use rolechat_core::{QuotaStatus, Role, Snowflake};
use tracing::debug;

use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

pub struct QuotaService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> QuotaService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Start of the current window
    pub fn window_start(&self) -> chrono::DateTime<chrono::Utc> {
        local_start_of_day(self.ctx.clock().now())
    }

    /// Usage of a user whose role is already known
    pub async fn status_for(&self, user_id: Snowflake, role: Role) -> ServiceResult<QuotaStatus> {
        let limit = PermissionService::new(self.ctx).daily_limit(role).await?;
        let used = self
            .ctx
            .message_repo()
            .count_since(user_id, self.window_start())
            .await?;

        debug!(user_id = %user_id, role = %role, ?limit, used, "Quota status");
        Ok(QuotaStatus::new(limit, used))
    }

    /// Unknown users are reported as exhausted
    pub async fn status(&self, user_id: Snowflake) -> ServiceResult<QuotaStatus> {
        match self.ctx.user_repo().find_by_id(user_id).await? {
            Some(user) => self.status_for(user.id, user.role).await,
            None => Ok(QuotaStatus::exhausted()),
        }
    }

    /// `None` means unlimited
    pub async fn remaining(&self, user_id: Snowflake) -> ServiceResult<Option<u32>> {
        Ok(self.status(user_id).await?.remaining())
    }

    pub async fn can_send(&self, user_id: Snowflake) -> ServiceResult<bool> {
        Ok(self.status(user_id).await?.can_send())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHarness;
    use chrono::Duration;

    #[tokio::test]
    async fn test_unknown_user_is_exhausted() {
        let harness = TestHarness::new();
        let quota = QuotaService::new(&harness.ctx);

        assert!(!quota.can_send(Snowflake::new(404)).await.unwrap());
        assert_eq!(quota.remaining(Snowflake::new(404)).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_super_admin_is_unlimited() {
        let harness = TestHarness::new();
        let root = harness.user("Root", Role::SuperAdmin).await;

        let status = QuotaService::new(&harness.ctx).status(root.id).await.unwrap();
        assert_eq!(status.limit, None);
        assert!(status.can_send());
    }

    #[tokio::test]
    async fn test_usage_counts_todays_messages_only() {
        let harness = TestHarness::new();
        let sarah = harness.user("Sarah", Role::Teacher).await;
        let alice = harness.user("Alice", Role::Student).await;

        harness.clock.advance(Duration::days(-1));
        harness.send_direct(&sarah, &alice, "yesterday").await.unwrap();
        harness.clock.advance(Duration::days(1));
        harness.send_direct(&sarah, &alice, "today").await.unwrap();

        let status = QuotaService::new(&harness.ctx).status(sarah.id).await.unwrap();
        assert_eq!(status.limit, Some(200));
        assert_eq!(status.used, 1);
        assert_eq!(status.remaining(), Some(199));
    }
}
