//! Domain entities - the messages flowing through the relay

mod message;

pub use message::{ChatMessage, DeliveredMessage, InboundMessage, MessageKind};
