//! Presence storage module.
//!
//! Tracks live gateway connections per user.

mod connections;

pub use connections::{ConnectionRegistry, CONNECTIONS_TTL};
