//! Chat service layer
//!
//! The façade the transport layer drives, its error taxonomy, and the
//! account gate that checks credentials and issues tokens.

mod account;
mod chat;
mod error;
mod request;

pub use account::AccountGate;
pub use chat::ChatService;
pub use error::{ChatError, ChatResult};
pub use request::{LogInRequest, LogInResponse};
