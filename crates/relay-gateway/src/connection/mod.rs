//! Connection management
//!
//! The session registry, the per-stream session pairing a receive loop with a
//! delivery loop, and the transport seam both sides of a stream speak.

mod registry;
mod session;
mod transport;

pub use registry::{
    AttachmentId, DeliveryQueue, DeliverySender, RegistryCounts, RegistryError, Reservation,
    SessionRegistry,
};
pub(crate) use session::close_sink;
pub use session::{SessionEnd, StreamSession};
pub use transport::{Outbound, TransportError};
