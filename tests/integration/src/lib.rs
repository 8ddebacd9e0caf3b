//! Integration test utilities for the chat relay
//!
//! Spawns the full HTTP/WebSocket application on an ephemeral port, backed by
//! in-memory storage, and drives it with real clients.

pub mod helpers;

pub use helpers::*;
