//! End-to-end scenarios through the REST router
//!
//! Every request goes through routing, extraction and error rendering; the
//! services run over in-memory repositories with a controllable clock.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use axum::http::StatusCode;
use chrono::{Duration, Local, NaiveTime, TimeZone, Utc};
use integration_tests::{fixtures::*, TestApp};
use rolechat_core::Role;

// ============================================================================
// Direct messages
// ============================================================================

#[tokio::test]
async fn test_teacher_messages_student_and_student_reads_it() {
    let app = TestApp::new();
    let sarah = app.user("Sarah", Role::Teacher).await;
    let alice = app.user("Alice", Role::Student).await;

    let quota: QuotaResponse = app
        .get("/api/users/me/quota", &sarah)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(quota.daily_limit, Some(200));

    let sent: MessageResponse = app
        .post("/api/messages", &sarah, &SendMessageRequest::to_user("Hello Alice!", &alice))
        .await
        .json(StatusCode::CREATED)
        .unwrap();
    assert_eq!(sent.content, "Hello Alice!");
    assert_eq!(sent.sender_id, sarah.id.to_string());
    assert!(!sent.is_read);
    let conversation_id = sent.conversation_id.clone().expect("direct message");

    let listed: ListResponse<ConversationResponse> = app
        .get("/api/conversations", &sarah)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(listed.data.len(), 1);
    assert_eq!(listed.data[0].id, conversation_id);
    let other = listed.data[0].other_user.as_ref().expect("counterpart");
    assert_eq!(other.name, "Alice");

    let read: MessageResponse = app
        .patch(&format!("/api/messages/{}/read", sent.id), &alice)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert!(read.is_read);
    assert_eq!(read.read_by.len(), 1);
    assert_eq!(read.read_by[0].user_id, alice.id.to_string());

    // Reading again changes nothing
    let again: MessageResponse = app
        .patch(&format!("/api/messages/{}/read", sent.id), &alice)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(again.read_by.len(), 1);

    assert_eq!(app.harness.broadcaster.events_named("message_read").len(), 1);
}

#[tokio::test]
async fn test_student_to_student_is_denied_without_side_effects() {
    let app = TestApp::new();
    let alice = app.user("Alice", Role::Student).await;
    let bob = app.user("Bob", Role::Student).await;

    let response = app
        .post("/api/messages", &alice, &SendMessageRequest::to_user("Hi Bob", &bob))
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "PERMISSION_DENIED");
    assert_eq!(response.body["details"]["sender_role"], "student");
    assert_eq!(response.body["details"]["recipient_role"], "student");
    assert_eq!(app.harness.conversation_count(), 0);
    assert_eq!(app.harness.message_count(), 0);
    assert!(app.harness.broadcaster.events_named("new_message").is_empty());
}

#[tokio::test]
async fn test_chat_table_change_allows_student_pairs() {
    let app = TestApp::new();
    let root = app.user("Root", Role::SuperAdmin).await;
    let alice = app.user("Alice", Role::Student).await;
    let bob = app.user("Bob", Role::Student).await;

    let response = app
        .put(
            "/api/permissions/chat/student",
            &root,
            &UpdateChatPermissionRequest {
                can_chat_with: vec![Role::Teacher, Role::Student],
                daily_message_limit: Some(50),
            },
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .post("/api/messages", &alice, &SendMessageRequest::to_user("Hi Bob", &bob))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_conversation_is_shared_by_both_sides() {
    let app = TestApp::new();
    let sarah = app.user("Sarah", Role::Teacher).await;
    let alice = app.user("Alice", Role::Student).await;

    let from_sarah: ConversationResponse = app
        .post("/api/conversations", &sarah, &OpenConversationRequest::with(&alice))
        .await
        .json(StatusCode::OK)
        .unwrap();
    let from_alice: ConversationResponse = app
        .post("/api/conversations", &alice, &OpenConversationRequest::with(&sarah))
        .await
        .json(StatusCode::OK)
        .unwrap();

    assert_eq!(from_sarah.id, from_alice.id);
    assert_eq!(app.harness.conversation_count(), 1);

    // Sending into the existing conversation by id
    let response = app
        .post(
            "/api/messages",
            &alice,
            &SendMessageRequest::to_conversation("Thanks!", &from_sarah.id),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(app.harness.conversation_count(), 1);
}

#[tokio::test]
async fn test_self_conversation_is_rejected() {
    let app = TestApp::new();
    let root = app.user("Root", Role::SuperAdmin).await;

    let response = app
        .post("/api/conversations", &root, &OpenConversationRequest::with(&root))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.code(), "SELF_CONVERSATION");
    assert_eq!(app.harness.conversation_count(), 0);
}

#[tokio::test]
async fn test_outsiders_cannot_read_a_conversation() {
    let app = TestApp::new();
    let sarah = app.user("Sarah", Role::Teacher).await;
    let alice = app.user("Alice", Role::Student).await;
    let bob = app.user("Bob", Role::Student).await;
    let root = app.user("Root", Role::SuperAdmin).await;

    let sent: MessageResponse = app
        .post("/api/messages", &sarah, &SendMessageRequest::to_user("Hello Alice!", &alice))
        .await
        .json(StatusCode::CREATED)
        .unwrap();
    let uri = format!("/api/conversations/{}/messages", sent.conversation_id.unwrap());

    let response = app.get(&uri, &bob).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "MEMBERSHIP_REQUIRED");

    // Oversight through view_all_conversations
    let page: ListResponse<MessageResponse> = app.get(&uri, &root).await.json(StatusCode::OK).unwrap();
    assert_eq!(page.data.len(), 1);
}

// ============================================================================
// Quota
// ============================================================================

#[tokio::test]
async fn test_admin_quota_resets_after_local_midnight() {
    let today = Local::now().date_naive();
    let noon = Local
        .from_local_datetime(&today.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()))
        .earliest()
        .unwrap()
        .with_timezone(&Utc);
    let app = TestApp::starting_at(noon);
    let admin = app.user("Dana", Role::Admin).await;
    let alice = app.user("Alice", Role::Student).await;

    for i in 0..500 {
        let response = app
            .post(
                "/api/messages",
                &admin,
                &SendMessageRequest::to_user(&format!("Notice {i}"), &alice),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "send {i}: {}", response.body);
    }

    let response = app
        .post("/api/messages", &admin, &SendMessageRequest::to_user("One more", &alice))
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.code(), "QUOTA_EXCEEDED");
    assert_eq!(app.harness.message_count(), 500);

    let quota: QuotaResponse = app
        .get("/api/users/me/quota", &admin)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(quota.used_today, 500);
    assert_eq!(quota.remaining, Some(0));
    assert!(!quota.can_send);

    let next_midnight = Local
        .from_local_datetime(&(today + Duration::days(1)).and_time(NaiveTime::MIN))
        .earliest()
        .unwrap()
        .with_timezone(&Utc);
    app.harness.clock.set(next_midnight + Duration::minutes(1));

    let response = app
        .post("/api/messages", &admin, &SendMessageRequest::to_user("New day", &alice))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_super_admin_is_unlimited() {
    let app = TestApp::new();
    let root = app.user("Root", Role::SuperAdmin).await;

    let quota: QuotaResponse = app
        .get("/api/users/me/quota", &root)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(quota.daily_limit, None);
    assert_eq!(quota.remaining, None);
    assert!(quota.can_send);
}

// ============================================================================
// Groups
// ============================================================================

#[tokio::test]
async fn test_group_messages_need_membership() {
    let app = TestApp::new();
    let sarah = app.user("Sarah", Role::Teacher).await;
    let alice = app.user("Alice", Role::Student).await;
    let bob = app.user("Bob", Role::Student).await;

    let group: GroupResponse = app
        .post("/api/groups", &sarah, &CreateGroupRequest::named("Physics 101"))
        .await
        .json(StatusCode::CREATED)
        .unwrap();
    let response = app
        .post(
            &format!("/api/groups/{}/members", group.id),
            &sarah,
            &AddMemberRequest {
                user_id: alice.id.to_string(),
            },
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let sent: MessageResponse = app
        .post("/api/messages", &alice, &SendMessageRequest::to_group("Question!", &group.id))
        .await
        .json(StatusCode::CREATED)
        .unwrap();
    assert_eq!(sent.group_id.as_deref(), Some(group.id.as_str()));

    let response = app
        .post("/api/messages", &bob, &SendMessageRequest::to_group("Me too", &group.id))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "MEMBERSHIP_REQUIRED");

    let page: ListResponse<MessageResponse> = app
        .get(&format!("/api/groups/{}/messages", group.id), &sarah)
        .await
        .json(StatusCode::OK)
        .unwrap();
    assert_eq!(page.data.len(), 1);

    let mine: ListResponse<GroupResponse> = app.get("/api/groups", &alice).await.json(StatusCode::OK).unwrap();
    assert_eq!(mine.data.len(), 1);
    assert_eq!(mine.data[0].name, "Physics 101");
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_creation_follows_capabilities() {
    let app = TestApp::new();
    let dana = app.user("Dana", Role::Admin).await;
    let alice = app.user("Alice", Role::Student).await;

    let created: UserResponse = app
        .post(
            "/api/users",
            &dana,
            &CreateUserRequest {
                name: "Sarah".into(),
                role: Role::Teacher,
            },
        )
        .await
        .json(StatusCode::CREATED)
        .unwrap();
    assert_eq!(created.role, Role::Teacher);
    assert!(!created.is_online);

    let response = app
        .post(
            "/api/users",
            &alice,
            &CreateUserRequest {
                name: "Mallory".into(),
                role: Role::Student,
            },
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.code(), "MISSING_PERMISSIONS");
}

#[tokio::test]
async fn test_login_marks_user_online() {
    let app = TestApp::new();
    let alice = app.user("Alice", Role::Student).await;

    let response = app
        .call(
            axum::http::Method::POST,
            "/api/auth/login",
            None,
            Some(&LoginRequest::for_user(&alice)),
        )
        .await;
    let auth: AuthResponse = response.json(StatusCode::OK).unwrap();

    assert!(!auth.token.is_empty());
    assert_eq!(auth.user.id, alice.id.to_string());
    assert!(auth.user.is_online);
    assert_eq!(id_of(&auth.user.id), alice.id);
}
