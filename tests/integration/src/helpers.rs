//! Test helpers for integration tests
//!
//! [`TestApp`] drives the REST router in process over the in-memory
//! service harness. [`TestServer`] starts the real API against PostgreSQL
//! and Redis and talks to it over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use rolechat_api::{create_app, create_app_state, create_router, health_routes, AppState};
use rolechat_common::AppConfig;
use rolechat_core::{Role, User};
use rolechat_service::testing::TestHarness;
use rolechat_service::ServiceContext;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceExt;

// ============================================================================
// In-process app
// ============================================================================

/// Status and JSON body of one in-process call
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// Parse the body, failing with the body text if the status differs
    pub fn json<T: DeserializeOwned>(self, expected_status: StatusCode) -> Result<T> {
        if self.status != expected_status {
            anyhow::bail!(
                "Expected status {}, got {}. Body: {}",
                expected_status,
                self.status,
                self.body
            );
        }
        Ok(serde_json::from_value(self.body)?)
    }

    /// Error code of an error body
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}

/// The REST router over a [`TestHarness`]
pub struct TestApp {
    pub harness: TestHarness,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_harness(TestHarness::new())
    }

    /// App whose clock starts at `now`
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self::with_harness(TestHarness::starting_at(now))
    }

    fn with_harness(harness: TestHarness) -> Self {
        let router = create_router()
            .merge(health_routes())
            .with_state(AppState::detached(harness.ctx.clone()));
        Self { harness, router }
    }

    pub async fn user(&self, name: &str, role: Role) -> User {
        self.harness.user(name, role).await
    }

    pub fn token(&self, user: &User) -> String {
        self.harness
            .ctx
            .jwt_service()
            .issue(user.id, user.role)
            .expect("issue test token")
            .token
    }

    pub async fn call<T: Serialize>(
        &self,
        method: Method,
        uri: &str,
        as_user: Option<&User>,
        body: Option<&T>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = as_user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token(user)));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };
        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str, as_user: &User) -> TestResponse {
        self.call::<Value>(Method::GET, uri, Some(as_user), None).await
    }

    pub async fn post<T: Serialize>(&self, uri: &str, as_user: &User, body: &T) -> TestResponse {
        self.call(Method::POST, uri, Some(as_user), Some(body)).await
    }

    pub async fn put<T: Serialize>(&self, uri: &str, as_user: &User, body: &T) -> TestResponse {
        self.call(Method::PUT, uri, Some(as_user), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, as_user: &User) -> TestResponse {
        self.call::<Value>(Method::PATCH, uri, Some(as_user), None).await
    }

    pub async fn delete(&self, uri: &str, as_user: &User) -> TestResponse {
        self.call::<Value>(Method::DELETE, uri, Some(as_user), None).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Live server
// ============================================================================

/// The API served on an ephemeral port against real infrastructure
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    /// Context of the running server, for seeding users
    pub ctx: ServiceContext,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server from the environment
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()?).await
    }

    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_app_state(&config).await?;
        let ctx = state.service_context().clone();
        let app = create_app(state, &config)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            addr,
            client,
            ctx,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Insert a user straight into the database
    pub async fn seed_user(&self, name: &str, role: Role) -> Result<User> {
        let user = User::new(self.ctx.generate_id(), name.to_string(), role, Utc::now());
        self.ctx.user_repo().create(&user).await?;
        Ok(user)
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).bearer_auth(token).send().await?)
    }

    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    pub async fn post_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).bearer_auth(token).json(body).send().await?)
    }

    pub async fn patch_auth(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.patch(&url).bearer_auth(token).send().await?)
    }
}

/// Configuration from the environment (and `.env`)
pub fn test_config() -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::from_env().map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Live tests run only when the infrastructure is configured
pub fn check_test_env() -> bool {
    dotenvy::dotenv().ok();
    for var in ["DATABASE_URL", "REDIS_URL", "JWT_SECRET"] {
        if std::env::var(var).is_err() {
            eprintln!("Skipping test: {var} not set");
            return false;
        }
    }
    true
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: reqwest::Response,
    expected_status: reqwest::StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(
    response: reqwest::Response,
    expected_status: reqwest::StatusCode,
) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
