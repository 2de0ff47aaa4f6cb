//! # rolechat-gateway
//!
//! WebSocket gateway: identifies clients, keeps their presence fresh,
//! tracks the rooms they joined and relays realtime events from Redis.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_router, run, GatewayState};
