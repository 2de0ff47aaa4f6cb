//! Events - realtime notifications, their scopes, and change-feed records

mod change_event;
mod realtime_event;
mod scope;

pub use change_event::{ChangeEvent, ChangeOperation, Collection};
pub use realtime_event::{
    EventKind, MessageReadPayload, RealtimeEvent, RoomAccessRevokedPayload, TypingPayload,
    UserStatusPayload,
};
pub use scope::BroadcastScope;
