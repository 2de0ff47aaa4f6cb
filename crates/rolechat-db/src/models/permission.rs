//! Permission table models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for chat_permissions table
#[derive(Debug, Clone, FromRow)]
pub struct ChatPermissionModel {
    pub role: String,
    pub can_chat_with: Vec<String>,
    pub daily_message_limit: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for role_settings table
#[derive(Debug, Clone, FromRow)]
pub struct RoleSettingModel {
    pub role: String,
    pub key: String,
    pub value: serde_json::Value,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for role_capabilities table
#[derive(Debug, Clone, FromRow)]
pub struct RoleCapabilityModel {
    pub role: String,
    pub capability: String,
    pub granted_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}
