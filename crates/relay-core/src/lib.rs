//! # relay-core
//!
//! Domain layer for the chat relay: message types, domain errors, and the ports
//! (identity, credential storage, message storage) the relay consumes.
//! This crate has zero dependencies on infrastructure (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;

// Re-export commonly used types at crate root
pub use entities::{ChatMessage, DeliveredMessage, InboundMessage, MessageKind};
pub use error::DomainError;
pub use traits::{IdentityGate, MessageStore, RepoResult, UserRepository};
