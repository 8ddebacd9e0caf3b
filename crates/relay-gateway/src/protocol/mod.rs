//! Chat wire protocol
//!
//! JSON frames exchanged over the chat WebSocket and the close codes that end a stream.

mod close_codes;
mod frames;

pub use close_codes::CloseCode;
pub use frames::{ClientFrame, ServerFrame, ServerMessage};
