//! Route handlers
//!
//! Thin adapters from HTTP to the services; all rules live in
//! `rolechat-service`.

pub mod auth;
pub mod conversations;
pub mod groups;
pub mod health;
pub mod messages;
pub mod permissions;
pub mod users;
