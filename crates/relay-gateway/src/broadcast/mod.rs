//! Message broadcasting
//!
//! The single consumer of the inbound queue: persists every message and fans
//! it out to all other attached sessions.

mod broadcaster;

pub use broadcaster::{Broadcaster, BroadcasterConfig};
