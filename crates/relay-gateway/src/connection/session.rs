//! Stream session
//!
//! One open chat stream of one attached user: a receive loop pushing the
//! client's messages onto the shared inbound queue, and a delivery loop
//! draining the session's own delivery queue onto the transport.

use super::registry::{AttachmentId, DeliveryQueue, SessionRegistry};
use super::transport::{Outbound, TransportError};
use crate::protocol::{ClientFrame, CloseCode};
use crate::service::ChatError;
use futures::{Sink, SinkExt, Stream, StreamExt};
use relay_core::InboundMessage;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How a stream session ended
#[derive(Debug)]
pub enum SessionEnd {
    /// The client finished its side of the stream
    Finished,
    /// The session was removed from the registry while the stream was open
    /// (logout or a newer attach)
    Closed,
    /// The stream was terminated by a failure
    Failed(ChatError),
}

impl SessionEnd {
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Finished | Self::Closed => CloseCode::Normal,
            Self::Failed(e) => e.close_code(),
        }
    }

    pub fn close_reason(&self) -> String {
        match self {
            Self::Finished => "stream finished".to_string(),
            Self::Closed => "logged out".to_string(),
            Self::Failed(e) => e.to_string(),
        }
    }

    pub fn into_result(self) -> Result<(), ChatError> {
        match self {
            Self::Finished | Self::Closed => Ok(()),
            Self::Failed(e) => Err(e),
        }
    }
}

enum LoopExit<K> {
    Receive(SessionEnd),
    Delivery(Result<Pin<Box<K>>, tokio::task::JoinError>),
}

/// An attached user's open stream
#[derive(Debug)]
pub struct StreamSession {
    username: String,
    queue: DeliveryQueue,
    inbound: mpsc::Sender<InboundMessage>,
}

impl StreamSession {
    /// Bind an attached user's delivery queue to the shared inbound queue
    pub fn new(
        username: impl Into<String>,
        queue: DeliveryQueue,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            username: username.into(),
            queue,
            inbound,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn attachment_id(&self) -> AttachmentId {
        self.queue.attachment_id()
    }

    /// Run both loops until the stream ends
    ///
    /// On return the attachment has been released from `registry` (or was
    /// already gone), the delivery loop has drained its queue, and a final
    /// close has been written to `sink`.
    pub async fn run<S, K>(self, registry: &SessionRegistry, frames: S, sink: K) -> SessionEnd
    where
        S: Stream<Item = Result<ClientFrame, TransportError>> + Send,
        K: Sink<Outbound, Error = TransportError> + Send + 'static,
    {
        let Self {
            username,
            queue,
            inbound,
        } = self;
        let attachment_id = queue.attachment_id();

        let mut delivery: JoinHandle<Pin<Box<K>>> =
            tokio::spawn(deliver(username.clone(), queue, Box::pin(sink)));
        let mut frames = std::pin::pin!(frames);

        let exit = loop {
            tokio::select! {
                frame = frames.next() => {
                    if let Some(end) = receive(&username, &inbound, frame).await {
                        break LoopExit::Receive(end);
                    }
                }
                joined = &mut delivery => break LoopExit::Delivery(joined),
            }
        };

        let (end, joined) = match exit {
            LoopExit::Receive(end) => {
                release(registry, &username, attachment_id).await;
                (end, delivery.await)
            }
            LoopExit::Delivery(Ok(sink)) => (SessionEnd::Closed, Ok(sink)),
            LoopExit::Delivery(Err(e)) => {
                // The queue is still registered, nothing would ever drain it
                release(registry, &username, attachment_id).await;
                (
                    SessionEnd::Failed(ChatError::internal("delivery loop failed")),
                    Err(e),
                )
            }
        };

        match joined {
            Ok(mut sink) => close_sink(&username, &mut sink, end.close_code(), end.close_reason()).await,
            Err(e) => tracing::error!(username = %username, error = %e, "Delivery loop panicked"),
        }

        match &end {
            SessionEnd::Failed(e) => {
                tracing::info!(username = %username, error = %e, "Chat stream terminated");
            }
            SessionEnd::Finished | SessionEnd::Closed => {
                tracing::info!(username = %username, "Chat stream ended");
            }
        }

        end
    }
}

async fn release(registry: &SessionRegistry, username: &str, attachment_id: AttachmentId) {
    if let Err(e) = registry.release(username, attachment_id).await {
        tracing::debug!(
            username = %username,
            attachment_id,
            error = %e,
            "Session already removed before stream ended"
        );
    }
}

/// Handle one item from the client; `Some` ends the receive loop
async fn receive(
    username: &str,
    inbound: &mpsc::Sender<InboundMessage>,
    frame: Option<Result<ClientFrame, TransportError>>,
) -> Option<SessionEnd> {
    let frame = match frame {
        None => return Some(SessionEnd::Finished),
        Some(Ok(frame)) => frame,
        Some(Err(TransportError::Decode(reason))) => {
            return Some(SessionEnd::Failed(ChatError::InvalidArgument(reason)));
        }
        Some(Err(e)) => {
            tracing::warn!(username = %username, error = %e, "Receive failed");
            return Some(SessionEnd::Failed(ChatError::Internal(e.to_string())));
        }
    };

    let Some(message) = frame.message else {
        return Some(SessionEnd::Failed(ChatError::invalid_argument(
            "frame carries no message",
        )));
    };
    if !message.kind.is_normal() {
        return Some(SessionEnd::Failed(ChatError::invalid_argument(format!(
            "unsupported message kind: {:?}",
            message.kind
        ))));
    }

    // Blocks while the broadcaster is behind
    if inbound
        .send(InboundMessage::new(username, message.text))
        .await
        .is_err()
    {
        return Some(SessionEnd::Failed(ChatError::internal(
            "broadcaster is not running",
        )));
    }

    tracing::trace!(username = %username, "Message queued for broadcast");
    None
}

/// Delivery loop: drain the queue until it closes, then hand the sink back
async fn deliver<K>(username: String, mut queue: DeliveryQueue, mut sink: Pin<Box<K>>) -> Pin<Box<K>>
where
    K: Sink<Outbound, Error = TransportError> + Send + 'static,
{
    while let Some(message) = queue.recv().await {
        let sequence = message.sequence_number;
        if let Err(e) = sink.send(Outbound::Deliver(message)).await {
            tracing::warn!(
                username = %username,
                sequence,
                error = %e,
                "Failed to write message to stream"
            );
        }
    }

    sink
}

/// Write the final close and shut the sink
pub(crate) async fn close_sink<K>(username: &str, sink: &mut Pin<Box<K>>, code: CloseCode, reason: String)
where
    K: Sink<Outbound, Error = TransportError>,
{
    if let Err(e) = sink.send(Outbound::close(code, reason)).await {
        tracing::debug!(username = %username, error = %e, "Failed to write close frame");
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(username = %username, error = %e, "Failed to close stream");
    }
}
