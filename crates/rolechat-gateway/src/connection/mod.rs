//! Connection management
//!
//! Tracks WebSocket connections and their room memberships.

mod connection;
mod manager;

pub use connection::{Connection, ConnectionState};
pub use manager::{ConnectionManager, Departure};
