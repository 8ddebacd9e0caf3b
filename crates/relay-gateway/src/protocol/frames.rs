//! Chat frames
//!
//! Every WebSocket text frame carries exactly one JSON object wrapping a
//! `message`:
//!
//! ```json
//! // client -> server
//! { "message": { "kind": "normal", "text": "hello" } }
//!
//! // server -> client
//! { "message": { "kind": "normal", "text": "hello", "username": "alice",
//!                "timestamp": 1700000000, "message_number": 42 } }
//! ```

use relay_core::{ChatMessage, DeliveredMessage, MessageKind};
use serde::{Deserialize, Serialize};

/// Frame sent by a client on an open chat stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
}

impl ClientFrame {
    /// Wrap a plain text message
    #[must_use]
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            message: Some(ChatMessage::normal(text)),
        }
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Frame pushed to a client for every message relayed to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub message: ServerMessage,
}

/// A relayed message as seen by its recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub kind: MessageKind,
    pub text: String,
    /// Sender of the message
    pub username: String,
    /// Server receipt time, unix seconds
    pub timestamp: i64,
    /// Sequence number assigned when the message was stored
    pub message_number: u64,
}

impl ServerFrame {
    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&DeliveredMessage> for ServerFrame {
    fn from(message: &DeliveredMessage) -> Self {
        Self {
            message: ServerMessage {
                kind: MessageKind::Normal,
                text: message.text.clone(),
                username: message.sender.clone(),
                timestamp: message.received_at.timestamp(),
                message_number: message.sequence_number,
            },
        }
    }
}
