//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in rolechat-core.
//! Each repository handles database operations for a specific domain entity.

mod conversation;
mod error;
mod group;
mod message;
mod permission;
mod user;

pub use conversation::PgConversationRepository;
pub use group::PgGroupRepository;
pub use message::PgMessageRepository;
pub use permission::PgPermissionRepository;
pub use user::PgUserRepository;
