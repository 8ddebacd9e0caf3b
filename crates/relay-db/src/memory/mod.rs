//! In-memory adapters
//!
//! Same contracts as the PostgreSQL repositories, without durability.
//! Selected when no `DATABASE_URL` is configured.

mod message;
mod user;

pub use message::{MemoryMessageStore, StoredMessage};
pub use user::MemoryUserRepository;
