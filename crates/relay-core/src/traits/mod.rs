//! Ports - the interfaces the relay consumes
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.

mod ports;

pub use ports::{IdentityGate, MessageStore, RepoResult, UserRepository};
