//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{Role, Snowflake};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(Snowflake),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Group not found: {0}")]
    GroupNotFound(Snowflake),

    #[error("Message not found: {0}")]
    MessageNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    #[error("Cannot create a conversation with yourself")]
    SelfConversation,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("A {} cannot message a {}", .sender_role.label(), .recipient_role.label())]
    PermissionDenied {
        sender_role: Role,
        recipient_role: Role,
    },

    #[error("Missing permission: {0}")]
    MissingPermission(String),

    #[error("Not a participant of this conversation or group")]
    MembershipRequired,

    // =========================================================================
    // Quota Errors
    // =========================================================================
    #[error("Daily message limit of {limit} reached")]
    QuotaExceeded { limit: u32 },

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    /// Lost a race on the conversation pair unique index; the caller re-reads
    #[error("Conversation already exists for this pair")]
    ConversationConflict,

    #[error("Already a member of this group")]
    AlreadyMember,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::ConversationNotFound(_) => "UNKNOWN_CONVERSATION",
            Self::GroupNotFound(_) => "UNKNOWN_GROUP",
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::SelfConversation => "SELF_CONVERSATION",

            // Authorization
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::MissingPermission(_) => "MISSING_PERMISSIONS",
            Self::MembershipRequired => "MEMBERSHIP_REQUIRED",

            // Quota
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",

            // Conflict
            Self::ConversationConflict => "CONVERSATION_CONFLICT",
            Self::AlreadyMember => "ALREADY_MEMBER",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::TransportError(_) => "TRANSPORT_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::ConversationNotFound(_)
                | Self::GroupNotFound(_)
                | Self::MessageNotFound(_)
        )
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::ContentTooLong { .. } | Self::SelfConversation
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::MissingPermission(_) | Self::MembershipRequired
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConversationConflict | Self::AlreadyMember)
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Infrastructure failures; the whole operation is safe to retry
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::TransportError(_) | Self::InternalError(_)
        )
    }

    /// HTTP-equivalent status for this error kind
    pub fn status_code(&self) -> u16 {
        if self.is_not_found() {
            404
        } else if self.is_authorization() {
            403
        } else if self.is_validation() {
            400
        } else if self.is_conflict() {
            409
        } else if self.is_quota() {
            429
        } else if matches!(self, Self::TransportError(_)) {
            503
        } else {
            500
        }
    }
}
