//! # rolechat-api
//!
//! REST surface over the rolechat services, built with Axum.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use response::{ApiError, ApiResult};
pub use routes::{create_router, health_routes};
pub use server::{create_app, create_app_state, run};
pub use state::{AppState, Infra};
