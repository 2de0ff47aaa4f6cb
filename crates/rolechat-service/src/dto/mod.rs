//! Data transfer objects for API requests and responses
//!
//! This module provides:
//! - Request DTOs with validation for API inputs
//! - Response DTOs for serializing API outputs
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    parse_id, AddMemberRequest, CreateConversationRequest, CreateGroupRequest, CreateUserRequest,
    GrantCapabilityRequest, ListMessagesQuery, ListUsersQuery, LoginRequest, SendMessageRequest,
    SendTarget, UpdateChatPermissionRequest, UpdateOnlineStatusRequest, UpdateRoleSettingRequest,
};

pub use responses::{
    ApiResponse, AuthResponse, ConversationResponse, DependencyCheck, GroupMemberResponse,
    GroupResponse, HealthChecks, HealthResponse, MessageResponse, PageResponse,
    PermissionOverviewResponse, ProbeStatus, PublicUserResponse, QuotaResponse,
    ReadReceiptResponse, ReadinessResponse, RolePermissionResponse, UserResponse, VerifyResponse,
};

pub use mappers::{ConversationWithDetails, GroupWithMembers, MessageWithSender};
