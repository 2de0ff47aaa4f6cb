//! In-memory doubles for service tests
//!
//! [`InMemoryStore`] implements every repository port over one mutex, so
//! each operation is atomic the way the SQL implementations are.
//! [`TestHarness`] wires it into a [`ServiceContext`] seeded with the
//! default permission tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rolechat_common::auth::JwtService;
use rolechat_core::traits::{
    Broadcaster, Clock, ConversationRepository, GroupRepository, MessageQuery, MessageRepository,
    PermissionRepository, RepoResult, UserRepository,
};
use rolechat_core::{
    BroadcastScope, Capabilities, ChatPermission, Conversation, DomainError, Group, GroupMember,
    Message, MessageTarget, ParticipantPair, RealtimeEvent, Role, RoleCapability, RoleSetting,
    Snowflake, SnowflakeGenerator, User,
};

use crate::dto::{MessageResponse, SendMessageRequest};
use crate::services::{MessageService, ServiceContext, ServiceContextBuilder, ServiceResult};

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
struct State {
    users: BTreeMap<Snowflake, User>,
    conversations: BTreeMap<Snowflake, Conversation>,
    groups: BTreeMap<Snowflake, Group>,
    members: Vec<GroupMember>,
    messages: BTreeMap<Snowflake, Message>,
    chat_permissions: HashMap<Role, ChatPermission>,
    settings: BTreeMap<(Role, String), RoleSetting>,
    grants: Vec<RoleCapability>,
    insert_failure: Option<String>,
}

impl State {
    fn drop_conversation(&mut self, id: Snowflake) {
        self.conversations.remove(&id);
        self.messages
            .retain(|_, m| m.target != MessageTarget::Conversation(id));
    }

    fn drop_group(&mut self, id: Snowflake) {
        self.groups.remove(&id);
        self.members.retain(|m| m.group_id != id);
        self.messages.retain(|_, m| m.target != MessageTarget::Group(id));
    }
}

/// Every repository port backed by process memory
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the rows the initial migration seeds
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock();
            for role in Role::ALL {
                state
                    .chat_permissions
                    .insert(role, ChatPermission::seeded(role, now));
                let granted = Capabilities::seeded_for(role);
                for (capability, _, _) in Capabilities::catalog().filter(|(c, _, _)| granted.contains(*c)) {
                    state.grants.push(RoleCapability {
                        role,
                        capability,
                        granted_by: None,
                        created_at: now,
                    });
                }
            }
        }
        store
    }

    pub fn conversation_count(&self) -> usize {
        self.state.lock().conversations.len()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Every later message insert fails with a database error
    pub fn fail_message_inserts(&self, reason: impl Into<String>) {
        self.state.lock().insert_failure = Some(reason.into());
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Snowflake]) -> RepoResult<Vec<User>> {
        let state = self.state.lock();
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }

    async fn list(&self, role: Option<Role>) -> RepoResult<Vec<User>> {
        let mut users: Vec<User> = self
            .state
            .lock()
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn create(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.lock();
        if state.users.contains_key(&user.id) {
            return Err(DomainError::ValidationError(format!("duplicate user id {}", user.id)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&self, user: &User) -> RepoResult<()> {
        let mut state = self.state.lock();
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or(DomainError::UserNotFound(user.id))?;
        stored.name = user.name.clone();
        stored.role = user.role;
        stored.avatar_url = user.avatar_url.clone();
        stored.updated_at = user.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let mut state = self.state.lock();
        state.users.remove(&id);
        let conversations: Vec<Snowflake> = state
            .conversations
            .values()
            .filter(|c| c.has_participant(id))
            .map(|c| c.id)
            .collect();
        for conversation in conversations {
            state.drop_conversation(conversation);
        }
        state.members.retain(|m| m.user_id != id);
        state.messages.retain(|_, m| m.sender_id != id);
        Ok(())
    }

    async fn set_presence(
        &self,
        id: Snowflake,
        online: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<User>> {
        let mut state = self.state.lock();
        Ok(state.users.get_mut(&id).map(|user| {
            user.set_presence(online, at);
            user.clone()
        }))
    }

    async fn find_stale_online(&self, cutoff: DateTime<Utc>) -> RepoResult<Vec<User>> {
        Ok(self
            .state
            .lock()
            .users
            .values()
            .filter(|u| u.is_online && u.last_seen < cutoff)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        Ok(self.state.lock().conversations.get(&id).cloned())
    }

    async fn find_by_pair(&self, pair: &ParticipantPair) -> RepoResult<Option<Conversation>> {
        Ok(self
            .state
            .lock()
            .conversations
            .values()
            .find(|c| c.participants == *pair)
            .cloned())
    }

    async fn create(&self, conversation: &Conversation) -> RepoResult<()> {
        let mut state = self.state.lock();
        if state
            .conversations
            .values()
            .any(|c| c.participants == conversation.participants)
        {
            return Err(DomainError::ConversationConflict);
        }
        for id in conversation.participant_ids() {
            if !state.users.contains_key(&id) {
                return Err(DomainError::UserNotFound(id));
            }
        }
        state.conversations.insert(conversation.id, conversation.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .state
            .lock()
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at).then(b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.state.lock().drop_conversation(id);
        Ok(())
    }

    async fn delete_if_empty(&self, id: Snowflake) -> RepoResult<bool> {
        let mut state = self.state.lock();
        let target = MessageTarget::Conversation(id);
        if state.messages.values().any(|m| m.target == target) {
            return Ok(false);
        }
        Ok(state.conversations.remove(&id).is_some())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Group>> {
        Ok(self.state.lock().groups.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Snowflake) -> RepoResult<Vec<Group>> {
        let state = self.state.lock();
        let mut groups: Vec<Group> = state
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.groups.get(&m.group_id).cloned())
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn create(&self, group: &Group, owner: &GroupMember) -> RepoResult<()> {
        let mut state = self.state.lock();
        state.groups.insert(group.id, group.clone());
        state.members.push(owner.clone());
        Ok(())
    }

    async fn update(&self, group: &Group) -> RepoResult<()> {
        let mut state = self.state.lock();
        let stored = state
            .groups
            .get_mut(&group.id)
            .ok_or(DomainError::GroupNotFound(group.id))?;
        *stored = group.clone();
        Ok(())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.state.lock().drop_group(id);
        Ok(())
    }

    async fn members(&self, group_id: Snowflake) -> RepoResult<Vec<GroupMember>> {
        let mut members: Vec<GroupMember> = self
            .state
            .lock()
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn find_member(
        &self,
        group_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<Option<GroupMember>> {
        Ok(self
            .state
            .lock()
            .members
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_member(&self, member: &GroupMember) -> RepoResult<()> {
        let mut state = self.state.lock();
        if !state.groups.contains_key(&member.group_id) {
            return Err(DomainError::GroupNotFound(member.group_id));
        }
        if !state.users.contains_key(&member.user_id) {
            return Err(DomainError::UserNotFound(member.user_id));
        }
        if state
            .members
            .iter()
            .any(|m| m.group_id == member.group_id && m.user_id == member.user_id)
        {
            return Err(DomainError::AlreadyMember);
        }
        state.members.push(member.clone());
        Ok(())
    }

    async fn remove_member(&self, group_id: Snowflake, user_id: Snowflake) -> RepoResult<()> {
        self.state
            .lock()
            .members
            .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        Ok(self.state.lock().messages.get(&id).cloned())
    }

    async fn create_within_quota(
        &self,
        message: &Message,
        limit: Option<u32>,
        window_start: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.insert_failure {
            return Err(DomainError::DatabaseError(reason.clone()));
        }

        if let Some(limit) = limit {
            let used = state
                .messages
                .values()
                .filter(|m| m.sender_id == message.sender_id && m.created_at >= window_start)
                .count();
            if used >= limit as usize {
                return Err(DomainError::QuotaExceeded { limit });
            }
        }

        match message.target {
            MessageTarget::Conversation(id) => {
                let conversation = state
                    .conversations
                    .get_mut(&id)
                    .ok_or(DomainError::ConversationNotFound(id))?;
                conversation.touch(message.created_at);
            }
            MessageTarget::Group(id) => {
                if !state.groups.contains_key(&id) {
                    return Err(DomainError::GroupNotFound(id));
                }
            }
        }

        state.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn count_since(&self, sender_id: Snowflake, since: DateTime<Utc>) -> RepoResult<u32> {
        let count = self
            .state
            .lock()
            .messages
            .values()
            .filter(|m| m.sender_id == sender_id && m.created_at >= since)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn list(&self, target: MessageTarget, query: MessageQuery) -> RepoResult<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .state
            .lock()
            .messages
            .values()
            .filter(|m| m.target == target)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let mut page: Vec<Message> = messages
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn mark_read(
        &self,
        message_id: Snowflake,
        reader: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<Message>> {
        let mut state = self.state.lock();
        let participants = match state.messages.get(&message_id).map(|m| m.target) {
            None => return Ok(None),
            Some(MessageTarget::Conversation(id)) => state
                .conversations
                .get(&id)
                .map(|c| c.participant_ids().to_vec())
                .unwrap_or_default(),
            Some(MessageTarget::Group(_)) => Vec::new(),
        };

        Ok(state.messages.get_mut(&message_id).map(|message| {
            message.record_read(reader, at);
            message.refresh_is_read(&participants);
            message.clone()
        }))
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        self.state.lock().messages.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn chat_permissions(&self) -> RepoResult<Vec<ChatPermission>> {
        Ok(self.state.lock().chat_permissions.values().cloned().collect())
    }

    async fn upsert_chat_permission(&self, permission: &ChatPermission) -> RepoResult<()> {
        self.state
            .lock()
            .chat_permissions
            .insert(permission.role, permission.clone());
        Ok(())
    }

    async fn role_settings(&self) -> RepoResult<Vec<RoleSetting>> {
        Ok(self.state.lock().settings.values().cloned().collect())
    }

    async fn upsert_role_setting(&self, setting: &RoleSetting) -> RepoResult<()> {
        self.state
            .lock()
            .settings
            .insert((setting.role, setting.key.clone()), setting.clone());
        Ok(())
    }

    async fn delete_role_setting(&self, role: Role, key: &str) -> RepoResult<()> {
        self.state.lock().settings.remove(&(role, key.to_string()));
        Ok(())
    }

    async fn role_capabilities(&self) -> RepoResult<Vec<RoleCapability>> {
        Ok(self.state.lock().grants.clone())
    }

    async fn grant_capability(&self, grant: &RoleCapability) -> RepoResult<()> {
        let mut state = self.state.lock();
        let exists = state
            .grants
            .iter()
            .any(|g| g.role == grant.role && g.capability == grant.capability);
        if !exists {
            state.grants.push(grant.clone());
        }
        Ok(())
    }

    async fn revoke_capability(&self, role: Role, capability: Capabilities) -> RepoResult<()> {
        self.state
            .lock()
            .grants
            .retain(|g| !(g.role == role && g.capability == capability));
        Ok(())
    }
}

// ============================================================================
// Broadcaster and clock
// ============================================================================

/// Records every published event; can be told to fail
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(BroadcastScope, RealtimeEvent)>>,
    failure: Mutex<Option<String>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(BroadcastScope, RealtimeEvent)> {
        self.events.lock().clone()
    }

    pub fn events_named(&self, name: &str) -> Vec<(BroadcastScope, RealtimeEvent)> {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.name() == name)
            .cloned()
            .collect()
    }

    /// Every later publish fails with a transport error
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn publish(&self, scope: &BroadcastScope, event: &RealtimeEvent) -> Result<(), DomainError> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(DomainError::TransportError(reason));
        }
        self.events.lock().push((*scope, event.clone()));
        Ok(())
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ============================================================================
// Harness
// ============================================================================

pub const TEST_JWT_SECRET: &str = "rolechat-test-secret-that-is-long-enough";

/// A [`ServiceContext`] over [`InMemoryStore`] with the seeded permissions
pub struct TestHarness {
    pub ctx: ServiceContext,
    pub store: Arc<InMemoryStore>,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(now: DateTime<Utc>) -> Self {
        let store = Arc::new(InMemoryStore::seeded(now));
        let broadcaster = Arc::new(RecordingBroadcaster::new());
        let clock = Arc::new(ManualClock::new(now));

        let ctx = ServiceContextBuilder::new()
            .user_repo(store.clone())
            .conversation_repo(store.clone())
            .group_repo(store.clone())
            .message_repo(store.clone())
            .permission_repo(store.clone())
            .broadcaster(broadcaster.clone())
            .jwt_service(Arc::new(JwtService::new(TEST_JWT_SECRET, 3600)))
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
            .clock(clock.clone())
            .build()
            .expect("every dependency is set");

        Self {
            ctx,
            store,
            broadcaster,
            clock,
        }
    }

    /// Insert a user directly, bypassing the creation rules
    pub async fn user(&self, name: &str, role: Role) -> User {
        let user = User::new(self.ctx.generate_id(), name.to_string(), role, self.clock.now());
        self.ctx
            .user_repo()
            .create(&user)
            .await
            .expect("insert test user");
        user
    }

    pub async fn send_direct(
        &self,
        from: &User,
        to: &User,
        content: &str,
    ) -> ServiceResult<MessageResponse> {
        MessageService::new(&self.ctx)
            .send(from.id, SendMessageRequest::direct(content, to.id))
            .await
    }

    /// Overwrite a role's daily limit, keeping its `can_chat_with` row
    pub async fn set_daily_limit(&self, role: Role, limit: Option<u32>) {
        let repo = self.ctx.permission_repo();
        let rows = repo.chat_permissions().await.expect("read chat permissions");
        let can_chat_with = rows
            .into_iter()
            .find(|row| row.role == role)
            .map(|row| row.can_chat_with)
            .unwrap_or_default();
        repo.upsert_chat_permission(&ChatPermission::new(role, can_chat_with, limit, self.clock.now()))
            .await
            .expect("write chat permission");
        self.ctx.permission_cache().invalidate();
    }

    pub async fn conversation_between(&self, a: Snowflake, b: Snowflake) -> Snowflake {
        let pair = ParticipantPair::new(a, b).expect("distinct participants");
        self.ctx
            .conversation_repo()
            .find_by_pair(&pair)
            .await
            .expect("lookup conversation")
            .expect("conversation exists")
            .id
    }

    pub fn conversation_count(&self) -> usize {
        self.store.conversation_count()
    }

    pub fn message_count(&self) -> usize {
        self.store.message_count()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
