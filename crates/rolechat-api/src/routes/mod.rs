//! Route definitions
//!
//! Everything under `/api` requires a bearer token; `/health` does not and
//! sits outside the rate limiter.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::handlers::{auth, conversations, groups, health, messages, permissions, users};
use crate::state::AppState;

/// The `/api` router
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api", api_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(conversation_routes())
        .merge(message_routes())
        .merge(group_routes())
        .merge(permission_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", get(auth::verify))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/contacts", get(users::list_contacts))
        .route("/users/me/quota", get(users::my_quota))
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
        .route("/users/:id/online-status", patch(users::update_online_status))
}

fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations",
            get(conversations::list_conversations).post(conversations::open_conversation),
        )
        .route(
            "/conversations/:id",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route("/conversations/:id/messages", get(conversations::list_messages))
}

fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(messages::send_message))
        .route("/messages/:id", delete(messages::delete_message))
        .route("/messages/:id/read", patch(messages::mark_read))
}

fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/:id", get(groups::get_group))
        .route("/groups/:id/members", post(groups::add_member))
        .route(
            "/groups/:id/members/:user_id",
            delete(groups::remove_member),
        )
        .route("/groups/:id/messages", get(groups::list_messages))
}

fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/permissions", get(permissions::overview))
        .route("/permissions/chat/:role", put(permissions::update_chat_permission))
        .route(
            "/permissions/settings/:role/:key",
            put(permissions::update_role_setting).delete(permissions::delete_role_setting),
        )
        .route(
            "/permissions/capabilities/:role",
            post(permissions::grant_capability),
        )
        .route(
            "/permissions/capabilities/:role/:name",
            delete(permissions::revoke_capability),
        )
}
