//! Message entities - a chat message before and after persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a chat message as declared by the client
///
/// Only [`MessageKind::Normal`] is relayed. Kinds this server does not know
/// deserialize to [`MessageKind::Other`] so they can be rejected explicitly
/// instead of failing to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Unspecified,
    Normal,
    #[serde(other)]
    Other,
}

impl MessageKind {
    /// Check if this kind is a plain text message
    #[inline]
    pub fn is_normal(self) -> bool {
        self == Self::Normal
    }
}

/// Message payload as sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: String,
}

impl ChatMessage {
    /// Create a plain text message
    pub fn normal(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Normal,
            text: text.into(),
        }
    }
}

/// A message received from a client, stamped by the server but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Stamp a message from `sender` with the current server time
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// Attach the sequence number assigned by the message store
    pub fn into_delivered(self, sequence_number: u64) -> DeliveredMessage {
        DeliveredMessage {
            sender: self.sender,
            text: self.text,
            received_at: self.received_at,
            sequence_number,
        }
    }
}

/// A persisted message, ready for fan-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub sender: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub sequence_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_serde() {
        let kind: MessageKind = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(kind, MessageKind::Normal);
        assert!(kind.is_normal());

        let kind: MessageKind = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(kind, MessageKind::Other);
        assert!(!kind.is_normal());

        assert_eq!(serde_json::to_string(&MessageKind::Normal).unwrap(), "\"normal\"");
    }

    #[test]
    fn test_chat_message_defaults() {
        let message: ChatMessage = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(message.kind, MessageKind::Unspecified);
        assert_eq!(message.text, "hi");
    }

    #[test]
    fn test_into_delivered_keeps_fields() {
        let inbound = InboundMessage::new("user1", "hello");
        let received_at = inbound.received_at;

        let delivered = inbound.into_delivered(42);
        assert_eq!(delivered.sender, "user1");
        assert_eq!(delivered.text, "hello");
        assert_eq!(delivered.received_at, received_at);
        assert_eq!(delivered.sequence_number, 42);
    }
}
