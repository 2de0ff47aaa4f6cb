//! Response DTOs for API endpoints
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use rolechat_core::entities::{GroupRole, MessageKind};
use rolechat_core::Role;
use serde::Serialize;
use std::time::Duration;

// ============================================================================
// Common Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Page-numbered listing
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
}

impl<T> PageResponse<T> {
    pub fn new(data: Vec<T>, page: u32, limit: u32) -> Self {
        Self { data, page, limit }
    }
}

// ============================================================================
// Auth Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserResponse,
}

// ============================================================================
// User Responses
// ============================================================================

/// Full user, presence included
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Public profile attached to messages
#[derive(Debug, Clone, Serialize)]
pub struct PublicUserResponse {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaResponse {
    /// `None` means unlimited
    pub daily_limit: Option<u32>,
    pub used_today: u32,
    pub remaining: Option<u32>,
    pub can_send: bool,
}

// ============================================================================
// Conversation Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: String,
    pub participants: [String; 2],
    /// The counterpart of the requesting user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_user: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageResponse>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Message Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ReadReceiptResponse {
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    /// Sender profile; absent if the sender was deleted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<PublicUserResponse>,
    pub content: String,
    pub message_type: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub is_read: bool,
    pub read_by: Vec<ReadReceiptResponse>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Group Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GroupMemberResponse {
    pub user_id: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUserResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<GroupMemberResponse>,
}

// ============================================================================
// Permission Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct RolePermissionResponse {
    pub role: Role,
    pub level: u8,
    /// Recipients this role may message after every rule is applied
    pub reachable_roles: Vec<Role>,
    pub daily_message_limit: Option<u32>,
    pub capabilities: Vec<&'static str>,
    /// Raw `chat_permissions` row, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_can_chat_with: Option<Vec<Role>>,
    /// `chat_restrictions` override, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_can_chat_with: Option<Vec<Role>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionOverviewResponse {
    pub roles: Vec<RolePermissionResponse>,
}

// ============================================================================
// Health Responses
// ============================================================================

/// Liveness: the process answers
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

/// Result of probing one backing service
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DependencyCheck {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl DependencyCheck {
    pub fn up(latency: Duration) -> Self {
        Self {
            status: ProbeStatus::Up,
            latency_ms: Some(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)),
        }
    }

    pub fn down() -> Self {
        Self {
            status: ProbeStatus::Down,
            latency_ms: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: DependencyCheck,
    pub redis: DependencyCheck,
}

/// Readiness: every backing service answered
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

impl ReadinessResponse {
    pub fn from_checks(checks: HealthChecks) -> Self {
        let ready = checks.database.is_up() && checks.redis.is_up();
        Self {
            status: if ready { "ready" } else { "not_ready" },
            timestamp: Utc::now(),
            checks,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
