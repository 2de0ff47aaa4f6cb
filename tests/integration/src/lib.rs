//! Integration test utilities for rolechat
//!
//! Helpers for driving the REST API end to end, in process over the
//! in-memory harness or over HTTP against real infrastructure.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
