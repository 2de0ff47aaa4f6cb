//! Live API tests
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Running Redis instance
//! - Environment variables: DATABASE_URL, REDIS_URL, JWT_SECRET
//!
//! They are skipped when the environment is not set.
//!
//! Run with: cargo test -p integration-tests --test live_tests

use integration_tests::{assert_json, assert_status, check_test_env, fixtures::*, TestServer};
use reqwest::StatusCode;
use rolechat_core::Role;

#[tokio::test]
async fn test_health_check() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_login_and_verify() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.seed_user("Alice", Role::Student).await.unwrap();

    let response = server
        .post("/api/auth/login", &LoginRequest::for_user(&alice))
        .await
        .unwrap();
    let auth: AuthResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(auth.user.is_online);

    let response = server.get_auth("/api/auth/verify", &auth.token).await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/api/conversations").await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_teacher_to_student_round_trip() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let sarah = server.seed_user("Sarah", Role::Teacher).await.unwrap();
    let alice = server.seed_user("Alice", Role::Student).await.unwrap();
    let sarah_token = server.ctx.jwt_service().issue(sarah.id, sarah.role).unwrap().token;
    let alice_token = server.ctx.jwt_service().issue(alice.id, alice.role).unwrap().token;

    let response = server
        .post_auth(
            "/api/messages",
            &sarah_token,
            &SendMessageRequest::to_user("Hello Alice!", &alice),
        )
        .await
        .unwrap();
    let sent: MessageResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    let response = server
        .patch_auth(&format!("/api/messages/{}/read", sent.id), &alice_token)
        .await
        .unwrap();
    let read: MessageResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(read.is_read);

    let response = server.get_auth("/api/conversations", &alice_token).await.unwrap();
    let listed: ListResponse<ConversationResponse> =
        assert_json(response, StatusCode::OK).await.unwrap();
    assert!(listed
        .data
        .iter()
        .any(|c| Some(c.id.as_str()) == sent.conversation_id.as_deref()));
}

#[tokio::test]
async fn test_student_pair_is_denied() {
    if !check_test_env() {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let alice = server.seed_user("Alice", Role::Student).await.unwrap();
    let bob = server.seed_user("Bob", Role::Student).await.unwrap();
    let token = server.ctx.jwt_service().issue(alice.id, alice.role).unwrap().token;

    let response = server
        .post_auth("/api/messages", &token, &SendMessageRequest::to_user("Hi Bob", &bob))
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();
}
