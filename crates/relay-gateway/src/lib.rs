//! # relay-gateway
//!
//! Chat relay: a session registry, a single broadcaster draining one shared
//! inbound queue, per-user chat streams, and the HTTP/WebSocket server in
//! front of them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_common::AppConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     relay_gateway::run(AppConfig::from_env()?).await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod service;

pub use broadcast::{Broadcaster, BroadcasterConfig};
pub use connection::{SessionRegistry, StreamSession};
pub use protocol::{ClientFrame, CloseCode, ServerFrame};
pub use server::{create_app, create_relay_state, run, RelayState};
pub use service::{ChatError, ChatService, LogInRequest};
