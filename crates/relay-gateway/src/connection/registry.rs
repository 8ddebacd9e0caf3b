//! Session registry
//!
//! The single source of truth for who is logged in and which of those users
//! have an open chat stream. Every mutation and every broadcast fan-out runs
//! under the same async mutex, so a session can never disappear halfway
//! through a delivery.
//!
//! A log-in first reserves the username, then checks credentials, then
//! confirms. A reserved slot already answers `AlreadyLoggedIn` to any other
//! log-in for the same name but is not yet visible as logged in.

use relay_core::DeliveredMessage;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::{SendError, TrySendError};
use tokio::sync::{mpsc, Mutex};

/// Identifies one attach of one user; a newer attach gets a larger id
pub type AttachmentId = u64;

/// Registry operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("User is already logged in: {0}")]
    AlreadyLoggedIn(String),

    #[error("User is not logged in: {0}")]
    NotLoggedIn(String),

    #[error("No session found for user: {0}")]
    NotFound(String),
}

/// Attachment state of a registry slot
#[derive(Debug)]
enum Attachment {
    /// Reserved by a log-in whose credentials are still being checked
    Pending,
    Detached,
    Attached {
        id: AttachmentId,
        sender: mpsc::Sender<Arc<DeliveredMessage>>,
    },
}

/// Server-side record of one logged-in user
#[derive(Debug)]
struct Session {
    attachment: Attachment,
}

impl Session {
    fn is_logged_in(&self) -> bool {
        !matches!(self.attachment, Attachment::Pending)
    }
}

/// Receiving half of a session's delivery queue, handed out by [`SessionRegistry::attach`]
///
/// The queue closes once the registry drops its sender, which happens when
/// the session is detached, released or replaced by a newer attach.
#[derive(Debug)]
pub struct DeliveryQueue {
    attachment_id: AttachmentId,
    receiver: mpsc::Receiver<Arc<DeliveredMessage>>,
}

impl DeliveryQueue {
    pub fn attachment_id(&self) -> AttachmentId {
        self.attachment_id
    }

    /// Wait for the next message; `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<Arc<DeliveredMessage>> {
        self.receiver.recv().await
    }
}

/// Sending half of an attached session's delivery queue, lent out during fan-out
#[derive(Debug, Clone)]
pub struct DeliverySender {
    username: String,
    sender: mpsc::Sender<Arc<DeliveredMessage>>,
}

impl DeliverySender {
    /// Recipient of this queue
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Push, waiting for room if the queue is full
    pub async fn push(
        &self,
        message: Arc<DeliveredMessage>,
    ) -> Result<(), SendError<Arc<DeliveredMessage>>> {
        self.sender.send(message).await
    }

    /// Push without waiting
    pub fn try_push(
        &self,
        message: Arc<DeliveredMessage>,
    ) -> Result<(), TrySendError<Arc<DeliveredMessage>>> {
        self.sender.try_send(message)
    }
}

/// Snapshot of registry occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryCounts {
    /// Users holding a registry slot, attached or not
    pub logged_in: usize,
    /// Users with an open chat stream
    pub attached: usize,
}

/// Maps usernames to their session state
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    delivery_capacity: usize,
    next_attachment: AtomicU64,
}

impl SessionRegistry {
    /// Create a registry whose delivery queues hold `delivery_capacity` messages
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(delivery_capacity: usize) -> Self {
        if delivery_capacity == 0 {
            tracing::warn!("Delivery capacity of zero requested, using 1");
        }
        let delivery_capacity = delivery_capacity.max(1);
        Self {
            sessions: Mutex::new(HashMap::new()),
            delivery_capacity,
            next_attachment: AtomicU64::new(1),
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared(delivery_capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(delivery_capacity))
    }

    pub fn delivery_capacity(&self) -> usize {
        self.delivery_capacity
    }

    /// Claim a username for a log-in in progress
    ///
    /// Fails with `AlreadyLoggedIn` if the name is logged in or reserved by
    /// another log-in. The slot stays pending until the returned reservation
    /// is confirmed; dropping it unconfirmed frees the slot again.
    pub async fn reserve(self: &Arc<Self>, username: &str) -> Result<Reservation, RegistryError> {
        self.insert(username, Attachment::Pending).await?;
        tracing::debug!(username = %username, "Session reserved");

        Ok(Reservation {
            registry: Arc::clone(self),
            username: username.to_string(),
            settled: false,
        })
    }

    /// Insert a logged-in, not yet attached session in one step
    #[cfg(test)]
    pub(crate) async fn register(&self, username: &str) -> Result<(), RegistryError> {
        self.insert(username, Attachment::Detached).await
    }

    async fn insert(&self, username: &str, attachment: Attachment) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(username) {
            return Err(RegistryError::AlreadyLoggedIn(username.to_string()));
        }

        sessions.insert(username.to_string(), Session { attachment });
        Ok(())
    }

    /// Resolve a pending slot: promote it to logged in, or drop it
    async fn settle(&self, username: &str, confirm: bool) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock().await;
        let pending = matches!(
            sessions.get(username),
            Some(Session { attachment: Attachment::Pending })
        );
        if !pending {
            return Err(RegistryError::NotFound(username.to_string()));
        }

        if confirm {
            if let Some(session) = sessions.get_mut(username) {
                session.attachment = Attachment::Detached;
            }
            tracing::debug!(username = %username, "Session registered");
        } else {
            sessions.remove(username);
            tracing::debug!(username = %username, "Reservation abandoned");
        }
        Ok(())
    }

    /// Install a fresh delivery queue on a logged-in user's session
    ///
    /// The queue is in place before this returns. Attaching an already
    /// attached user replaces the previous queue, which closes it.
    pub async fn attach(&self, username: &str) -> Result<DeliveryQueue, RegistryError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(username)
            .filter(|session| session.is_logged_in())
            .ok_or_else(|| RegistryError::NotLoggedIn(username.to_string()))?;

        let id = self.next_attachment.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.delivery_capacity);

        let previous = std::mem::replace(
            &mut session.attachment,
            Attachment::Attached { id, sender },
        );
        if let Attachment::Attached { id: replaced, .. } = previous {
            tracing::info!(
                username = %username,
                replaced_attachment = replaced,
                "Previous stream replaced by a new attach"
            );
        }

        tracing::debug!(username = %username, attachment_id = id, "Session attached");

        Ok(DeliveryQueue {
            attachment_id: id,
            receiver,
        })
    }

    /// Remove a user's session, closing its delivery queue if attached
    ///
    /// A slot still pending its log-in counts as not found and is left alone.
    pub async fn detach(&self, username: &str) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock().await;
        if !sessions.get(username).is_some_and(Session::is_logged_in) {
            return Err(RegistryError::NotFound(username.to_string()));
        }

        if let Some(session) = sessions.remove(username) {
            tracing::debug!(
                username = %username,
                was_attached = matches!(session.attachment, Attachment::Attached { .. }),
                "Session detached"
            );
        }
        Ok(())
    }

    /// Remove a user's session only if it still carries `attachment_id`
    ///
    /// Used by a terminating stream, so that it never removes a session that
    /// was logged out and logged in again, or re-attached, in the meantime.
    pub async fn release(
        &self,
        username: &str,
        attachment_id: AttachmentId,
    ) -> Result<(), RegistryError> {
        let mut sessions = self.sessions.lock().await;

        let owned = matches!(
            sessions.get(username),
            Some(Session { attachment: Attachment::Attached { id, .. } }) if *id == attachment_id
        );
        if !owned {
            return Err(RegistryError::NotFound(username.to_string()));
        }

        sessions.remove(username);
        tracing::debug!(username = %username, attachment_id, "Session released");
        Ok(())
    }

    /// Apply `f` to every attached session except `username`'s
    ///
    /// The registry lock is held until every call to `f` has completed, so
    /// register, attach, detach and release all wait for the fan-out.
    /// Returns the number of sessions visited.
    pub async fn for_each_attached_except<F, Fut>(&self, username: &str, mut f: F) -> usize
    where
        F: FnMut(DeliverySender) -> Fut,
        Fut: Future<Output = ()>,
    {
        let sessions = self.sessions.lock().await;
        let mut visited = 0;

        for (name, session) in sessions.iter() {
            if name == username {
                continue;
            }
            if let Attachment::Attached { sender, .. } = &session.attachment {
                f(DeliverySender {
                    username: name.clone(),
                    sender: sender.clone(),
                })
                .await;
                visited += 1;
            }
        }

        visited
    }

    pub async fn is_logged_in(&self, username: &str) -> bool {
        self.sessions
            .lock()
            .await
            .get(username)
            .is_some_and(Session::is_logged_in)
    }

    pub async fn is_attached(&self, username: &str) -> bool {
        matches!(
            self.sessions.lock().await.get(username),
            Some(Session { attachment: Attachment::Attached { .. } })
        )
    }

    /// Number of logged-in sessions, attached or not
    pub async fn session_count(&self) -> usize {
        self.counts().await.logged_in
    }

    pub async fn counts(&self) -> RegistryCounts {
        let sessions = self.sessions.lock().await;
        RegistryCounts {
            logged_in: sessions.values().filter(|s| s.is_logged_in()).count(),
            attached: sessions
                .values()
                .filter(|s| matches!(s.attachment, Attachment::Attached { .. }))
                .count(),
        }
    }
}

/// A username claimed by [`SessionRegistry::reserve`]
///
/// Must be settled with [`Reservation::confirm`] or [`Reservation::abandon`].
/// Dropping it unsettled (for instance when the log-in request is cancelled)
/// abandons the slot from a background task.
pub struct Reservation {
    registry: Arc<SessionRegistry>,
    username: String,
    settled: bool,
}

impl Reservation {
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Turn the reserved slot into a logged-in, detached session
    pub async fn confirm(mut self) -> Result<(), RegistryError> {
        // Marked only once settled, so a cancelled confirm still abandons on drop
        let settled = self.registry.settle(&self.username, true).await;
        self.settled = true;
        settled
    }

    /// Free the reserved slot
    pub async fn abandon(mut self) {
        let settled = self.registry.settle(&self.username, false).await;
        self.settled = true;
        if let Err(e) = settled {
            tracing::warn!(username = %self.username, error = %e, "Reservation already gone");
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let registry = Arc::clone(&self.registry);
        let username = std::mem::take(&mut self.username);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if registry.settle(&username, false).await.is_ok() {
                        tracing::debug!(username = %username, "Unsettled reservation released");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(username = %username, "Reservation dropped outside a runtime, slot stays pending");
            }
        }
    }
}

impl std::fmt::Debug for Reservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("username", &self.username)
            .field("settled", &self.settled)
            .finish()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("delivery_capacity", &self.delivery_capacity)
            .finish()
    }
}
