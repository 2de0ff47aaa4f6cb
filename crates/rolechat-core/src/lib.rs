//! # rolechat-core
//!
//! Domain layer containing entities, value objects, the permission and quota
//! rules, realtime event types and the repository/broadcaster ports.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod permissions;
pub mod quota;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    ChatPermission, ChatRestrictions, Conversation, Group, GroupMember, GroupRole, Message,
    MessageKind, MessageTarget, ParticipantPair, PublicProfile, ReadReceipt, RoleCapability,
    RoleSetting, User,
};
pub use error::DomainError;
pub use events::{BroadcastScope, ChangeEvent, Collection, EventKind, RealtimeEvent};
pub use permissions::{PermissionResolver, PermissionSnapshot};
pub use quota::QuotaStatus;
pub use traits::{
    Broadcaster, Clock, ConversationRepository, GroupRepository, MessageQuery, MessageRepository,
    NoopBroadcaster, PermissionRepository, RepoResult, SystemClock, UserRepository,
};
pub use value_objects::{Capabilities, Role, Snowflake, SnowflakeGenerator, SnowflakeParseError};
