//! # rolechat-service
//!
//! Application layer: the permission, quota, conversation, message and
//! presence services, their DTOs, and the bridge that turns database change
//! notifications into realtime events.

pub mod change_feed;
pub mod dto;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use change_feed::{scopes_for, ChangeFeedBridge};
pub use services::{
    AuthService, ConversationService, GroupService, MessageService, PermissionService,
    PresenceService, QuotaService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, ServiceSettings, UserService,
};
