//! Service context - dependency container for services
//!
//! Holds the repositories, the broadcaster, the clock and the cached
//! permission snapshot shared by every service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use rolechat_common::auth::JwtService;
use rolechat_common::{AppConfig, AppError};
use rolechat_core::traits::{
    Broadcaster, Clock, ConversationRepository, GroupRepository, MessageRepository,
    PermissionRepository, SystemClock, UserRepository,
};
use rolechat_core::{
    BroadcastScope, PermissionResolver, PermissionSnapshot, RealtimeEvent, Snowflake,
    SnowflakeGenerator,
};
use rolechat_db::{
    PgConversationRepository, PgGroupRepository, PgMessageRepository, PgPermissionRepository,
    PgPool, PgUserRepository,
};
use tracing::warn;

use super::error::{ServiceError, ServiceResult};

/// Tunables the services read at runtime
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Longest accepted message, in characters after trimming
    pub max_content_length: usize,
    /// Online users silent for longer than this are expired
    pub presence_grace: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_content_length: rolechat_core::entities::MAX_CONTENT_LENGTH,
            presence_grace: Duration::seconds(90),
        }
    }
}

impl ServiceSettings {
    /// Settings from the loaded configuration
    ///
    /// # Errors
    /// Returns an error if the presence grace period does not fit a `chrono::Duration`
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let presence_grace = Duration::from_std(config.realtime.presence_grace())
            .map_err(|e| AppError::Config(format!("PRESENCE_GRACE_SECS: {e}")))?;
        Ok(Self {
            max_content_length: config.messages.max_length,
            presence_grace,
        })
    }
}

/// Cached [`PermissionSnapshot`] with a generation counter.
///
/// A load that raced with an invalidation is not stored.
#[derive(Debug, Default)]
pub struct PermissionCache {
    snapshot: RwLock<Option<Arc<PermissionSnapshot>>>,
    generation: AtomicU64,
}

impl PermissionCache {
    pub fn get(&self) -> Option<Arc<PermissionSnapshot>> {
        self.snapshot.read().clone()
    }

    /// Generation to hand back to [`PermissionCache::store`]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn store(&self, loaded_at: u64, snapshot: Arc<PermissionSnapshot>) {
        let mut slot = self.snapshot.write();
        if self.generation.load(Ordering::Acquire) == loaded_at {
            *slot = Some(snapshot);
        }
    }

    pub fn invalidate(&self) {
        let mut slot = self.snapshot.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        *slot = None;
    }
}

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    conversation_repo: Arc<dyn ConversationRepository>,
    group_repo: Arc<dyn GroupRepository>,
    message_repo: Arc<dyn MessageRepository>,
    permission_repo: Arc<dyn PermissionRepository>,

    // Realtime
    broadcaster: Arc<dyn Broadcaster>,

    // Services
    jwt_service: Arc<JwtService>,
    snowflake_generator: Arc<SnowflakeGenerator>,
    clock: Arc<dyn Clock>,
    resolver: Arc<PermissionResolver>,
    permissions: Arc<PermissionCache>,
    settings: ServiceSettings,
}

impl ServiceContext {
    // === Repositories ===

    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    pub fn conversation_repo(&self) -> &dyn ConversationRepository {
        self.conversation_repo.as_ref()
    }

    pub fn group_repo(&self) -> &dyn GroupRepository {
        self.group_repo.as_ref()
    }

    pub fn message_repo(&self) -> &dyn MessageRepository {
        self.message_repo.as_ref()
    }

    pub fn permission_repo(&self) -> &dyn PermissionRepository {
        self.permission_repo.as_ref()
    }

    // === Realtime ===

    pub fn broadcaster(&self) -> &dyn Broadcaster {
        self.broadcaster.as_ref()
    }

    /// Fan an event out to `scope`. Failures are logged and swallowed: the
    /// state change that produced the event is already committed.
    pub async fn publish(&self, scope: BroadcastScope, event: RealtimeEvent) {
        if let Err(e) = self.broadcaster.publish(&scope, &event).await {
            warn!(scope = %scope, event = %event.name(), error = %e, "Failed to publish realtime event");
        }
    }

    /// The same context publishing through `broadcaster`. Repositories and
    /// the permission cache stay shared.
    #[must_use]
    pub fn with_broadcaster(&self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster,
            ..self.clone()
        }
    }

    // === Services ===

    pub fn jwt_service(&self) -> &JwtService {
        self.jwt_service.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn resolver(&self) -> &PermissionResolver {
        self.resolver.as_ref()
    }

    pub fn permission_cache(&self) -> &PermissionCache {
        self.permissions.as_ref()
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("resolver", &self.resolver)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    conversation_repo: Option<Arc<dyn ConversationRepository>>,
    group_repo: Option<Arc<dyn GroupRepository>>,
    message_repo: Option<Arc<dyn MessageRepository>>,
    permission_repo: Option<Arc<dyn PermissionRepository>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    jwt_service: Option<Arc<JwtService>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    settings: ServiceSettings,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the PostgreSQL repositories for every port
    pub fn postgres(self, pool: &PgPool) -> Self {
        self.user_repo(Arc::new(PgUserRepository::new(pool.clone())))
            .conversation_repo(Arc::new(PgConversationRepository::new(pool.clone())))
            .group_repo(Arc::new(PgGroupRepository::new(pool.clone())))
            .message_repo(Arc::new(PgMessageRepository::new(pool.clone())))
            .permission_repo(Arc::new(PgPermissionRepository::new(pool.clone())))
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn conversation_repo(mut self, repo: Arc<dyn ConversationRepository>) -> Self {
        self.conversation_repo = Some(repo);
        self
    }

    pub fn group_repo(mut self, repo: Arc<dyn GroupRepository>) -> Self {
        self.group_repo = Some(repo);
        self
    }

    pub fn message_repo(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.message_repo = Some(repo);
        self
    }

    pub fn permission_repo(mut self, repo: Arc<dyn PermissionRepository>) -> Self {
        self.permission_repo = Some(repo);
        self
    }

    pub fn broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn jwt_service(mut self, service: Arc<JwtService>) -> Self {
        self.jwt_service = Some(service);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    /// Defaults to [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn settings(mut self, settings: ServiceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        fn required<T>(value: Option<T>, name: &str) -> ServiceResult<T> {
            value.ok_or_else(|| ServiceError::validation(format!("{name} is required")))
        }

        Ok(ServiceContext {
            user_repo: required(self.user_repo, "user_repo")?,
            conversation_repo: required(self.conversation_repo, "conversation_repo")?,
            group_repo: required(self.group_repo, "group_repo")?,
            message_repo: required(self.message_repo, "message_repo")?,
            permission_repo: required(self.permission_repo, "permission_repo")?,
            broadcaster: required(self.broadcaster, "broadcaster")?,
            jwt_service: required(self.jwt_service, "jwt_service")?,
            snowflake_generator: required(self.snowflake_generator, "snowflake_generator")?,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            resolver: Arc::new(PermissionResolver::new()),
            permissions: Arc::new(PermissionCache::default()),
            settings: self.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_reports_missing_dependency() {
        let err = ServiceContextBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("user_repo is required"));
    }

    #[test]
    fn test_cache_drops_stale_load() {
        let cache = PermissionCache::default();
        let loaded_at = cache.generation();
        cache.invalidate();
        cache.store(loaded_at, Arc::new(PermissionSnapshot::default()));
        assert!(cache.get().is_none());

        let loaded_at = cache.generation();
        cache.store(loaded_at, Arc::new(PermissionSnapshot::default()));
        assert!(cache.get().is_some());

        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
