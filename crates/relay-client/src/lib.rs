//! # relay-client
//!
//! Terminal client for the chat relay. Logs in over HTTP, then sends every
//! line read from its input as a chat message and prints every message
//! relayed to it as `[time] sender text`.

mod client;
mod render;

pub use client::{ChatEnd, ClientError, RelayClient};
pub use render::render_message;
