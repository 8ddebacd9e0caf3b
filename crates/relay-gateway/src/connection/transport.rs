//! Transport seam between a chat stream and its connection
//!
//! A stream session reads `Result<ClientFrame, TransportError>` items and
//! writes [`Outbound`] items. The WebSocket handler adapts an axum socket to
//! this shape; tests use plain channels.

use crate::protocol::CloseCode;
use relay_core::DeliveredMessage;
use std::sync::Arc;
use thiserror::Error;

/// Item written to a client by its stream session
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A message relayed from another user
    Deliver(Arc<DeliveredMessage>),
    /// Final frame of the stream
    Close { code: CloseCode, reason: String },
}

impl Outbound {
    pub fn close(code: CloseCode, reason: impl Into<String>) -> Self {
        Self::Close {
            code,
            reason: reason.into(),
        }
    }
}

/// Transport failures as seen by a stream session
#[derive(Debug, Error)]
pub enum TransportError {
    /// The client sent something that is not a chat frame
    #[error("Undecodable frame: {0}")]
    Decode(String),

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Connection closed")]
    Closed,

    #[error("Transport error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<axum::Error> for TransportError {
    fn from(e: axum::Error) -> Self {
        Self::Io(e.to_string())
    }
}
