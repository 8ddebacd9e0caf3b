//! Broadcaster
//!
//! Drains the shared inbound queue on one dedicated task. Because there is
//! exactly one consumer, the order in which it drains the queue is the order
//! every recipient observes.

use crate::connection::SessionRegistry;
use relay_common::{DeliveryPolicy, RelayConfig};
use relay_core::{DeliveredMessage, InboundMessage, MessageStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

/// Configuration for the broadcaster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcasterConfig {
    /// Capacity of the shared inbound queue
    pub inbound_capacity: usize,
    /// Behaviour on a full recipient queue
    pub policy: DeliveryPolicy,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 1024,
            policy: DeliveryPolicy::Block,
        }
    }
}

impl From<&RelayConfig> for BroadcasterConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            inbound_capacity: config.inbound_capacity,
            policy: config.delivery_policy,
        }
    }
}

/// Persists inbound messages and fans them out to attached sessions
pub struct Broadcaster {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn MessageStore>,
    policy: DeliveryPolicy,
}

impl Broadcaster {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn MessageStore>,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            registry,
            store,
            policy,
        }
    }

    /// Create the inbound queue and spawn the draining task
    ///
    /// The task runs until every clone of the returned sender is dropped.
    /// Must be called from within a Tokio runtime.
    /// A zero capacity is raised to one.
    pub fn start(self, inbound_capacity: usize) -> (mpsc::Sender<InboundMessage>, JoinHandle<()>) {
        if inbound_capacity == 0 {
            tracing::warn!("Inbound capacity of zero raised to one");
        }
        let inbound_capacity = inbound_capacity.max(1);
        let (sender, receiver) = mpsc::channel(inbound_capacity);

        tracing::info!(
            inbound_capacity,
            policy = ?self.policy,
            "Broadcaster started"
        );

        let handle = tokio::spawn(self.run(receiver));
        (sender, handle)
    }

    async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            self.handle_message(message).await;
        }

        tracing::info!("Broadcaster stopped: inbound queue closed");
    }

    /// Persist one message and deliver it to every attached session but its sender
    ///
    /// Returns the number of recipients it was queued for, or `None` if it
    /// could not be persisted and was dropped.
    pub async fn handle_message(&self, message: InboundMessage) -> Option<usize> {
        let sequence = match self.store.append(&message).await {
            Ok(sequence) => sequence,
            Err(e) => {
                tracing::error!(
                    sender = %message.sender,
                    error = %e,
                    "Failed to persist message, dropping it"
                );
                return None;
            }
        };

        let delivered = Arc::new(message.into_delivered(sequence));
        let recipients = self.fan_out(&delivered).await;

        tracing::debug!(
            sender = %delivered.sender,
            sequence,
            recipients,
            "Message broadcast"
        );

        Some(recipients)
    }

    async fn fan_out(&self, message: &Arc<DeliveredMessage>) -> usize {
        let policy = self.policy;
        let queued = AtomicUsize::new(0);
        let queued_ref = &queued;

        self.registry
            .for_each_attached_except(&message.sender, |recipient| {
                let message = Arc::clone(message);
                async move {
                    let sequence = message.sequence_number;
                    let pushed = match policy {
                        DeliveryPolicy::Block => recipient.push(message).await.is_ok(),
                        DeliveryPolicy::DropOnFull => match recipient.try_push(message) {
                            Ok(()) => true,
                            Err(TrySendError::Full(_)) => {
                                tracing::warn!(
                                    recipient = %recipient.username(),
                                    sequence,
                                    "Delivery queue full, message dropped for recipient"
                                );
                                false
                            }
                            Err(TrySendError::Closed(_)) => false,
                        },
                    };

                    if pushed {
                        queued_ref.fetch_add(1, Ordering::Relaxed);
                    } else {
                        tracing::trace!(
                            recipient = %recipient.username(),
                            sequence,
                            "Message not queued for recipient"
                        );
                    }
                }
            })
            .await;

        queued.into_inner()
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .finish()
    }
}
