//! Repository implementations
//!
//! PostgreSQL implementations of the ports defined in relay-core.

mod error;
mod message;
mod user;

pub use message::PgMessageStore;
pub use user::PgUserRepository;
