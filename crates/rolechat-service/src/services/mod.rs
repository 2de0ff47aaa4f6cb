//! Business logic services
//!
//! Each service borrows the shared [`ServiceContext`] for the length of a
//! request and owns one slice of the chat rules.

pub mod auth;
pub mod context;
pub mod conversation;
pub mod error;
pub mod group;
pub mod message;
pub mod permission;
pub mod presence;
pub mod quota;
pub mod user;

pub use auth::AuthService;
pub use context::{PermissionCache, ServiceContext, ServiceContextBuilder, ServiceSettings};
pub use conversation::ConversationService;
pub use error::{ServiceError, ServiceResult};
pub use group::GroupService;
pub use message::{scope_for, MessageService};
pub use permission::PermissionService;
pub use presence::PresenceService;
pub use quota::QuotaService;
pub use user::UserService;
