//! Chat service
//!
//! Drives the session registry, the broadcaster and stream sessions on behalf
//! of the transport layer. Identities handed to [`ChatService::log_out`] and
//! [`ChatService::chat`] must already have been verified by the caller.

use futures::{Sink, Stream};
use relay_common::RelayConfig;
use relay_core::{IdentityGate, InboundMessage, MessageStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::broadcast::{Broadcaster, BroadcasterConfig};
use crate::connection::{Outbound, SessionRegistry, StreamSession, TransportError};
use crate::protocol::ClientFrame;

use super::error::{ChatError, ChatResult};
use super::request::LogInRequest;

/// Façade exposing LogInOrRegister, LogOut and Chat
pub struct ChatService {
    registry: Arc<SessionRegistry>,
    identity: Arc<dyn IdentityGate>,
    inbound: mpsc::Sender<InboundMessage>,
    broadcaster: JoinHandle<()>,
}

impl ChatService {
    /// Build the registry and start the broadcaster
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        identity: Arc<dyn IdentityGate>,
        store: Arc<dyn MessageStore>,
        config: &RelayConfig,
    ) -> Self {
        let registry = SessionRegistry::new_shared(config.delivery_capacity);
        let broadcaster_config = BroadcasterConfig::from(config);
        let (inbound, broadcaster) =
            Broadcaster::new(registry.clone(), store, broadcaster_config.policy)
                .start(broadcaster_config.inbound_capacity);

        Self {
            registry,
            identity,
            inbound,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Whether the broadcaster task is still draining the inbound queue
    pub fn is_broadcasting(&self) -> bool {
        !self.broadcaster.is_finished()
    }

    /// Claim a registry slot, check or create the account, and return a token
    ///
    /// The slot is claimed before any credential work, so a concurrent log-in
    /// for the same name always observes `AlreadyLoggedIn`, whatever password
    /// it presents. A failed credential check or token issue frees the slot.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn log_in_or_register(&self, request: LogInRequest) -> ChatResult<String> {
        request.validate()?;
        let LogInRequest { username, password } = request;

        let reservation = self.registry.reserve(&username).await?;

        let token = match self.admit(&username, &password).await {
            Ok(token) => token,
            Err(e) => {
                reservation.abandon().await;
                return Err(e);
            }
        };

        reservation
            .confirm()
            .await
            .map_err(|e| ChatError::internal(format!("reserved slot vanished: {e}")))?;

        info!("User logged in");
        Ok(token)
    }

    async fn admit(&self, username: &str, password: &str) -> ChatResult<String> {
        self.identity.authenticate(username, password).await?;
        self.identity.issue_token(username).map_err(|e| {
            warn!(error = %e, "Token issue failed after authentication");
            ChatError::from(e)
        })
    }

    /// Remove a logged-in user's session, ending its stream if one is open
    #[instrument(skip(self))]
    pub async fn log_out(&self, identity: Option<&str>) -> ChatResult<()> {
        let username = verified(identity)?;
        self.registry.detach(username).await?;

        info!(username = %username, "User logged out");
        Ok(())
    }

    /// Attach the user and run a stream session over `frames` / `sink` until it ends
    ///
    /// Whatever the outcome, a close item is written to `sink` and the
    /// user's registry entry for this stream is gone before this returns.
    pub async fn chat<S, K>(&self, identity: Option<&str>, frames: S, sink: K) -> ChatResult<()>
    where
        S: Stream<Item = Result<ClientFrame, TransportError>> + Send,
        K: Sink<Outbound, Error = TransportError> + Send + 'static,
    {
        let username = match verified(identity) {
            Ok(username) => username,
            Err(e) => return reject("", sink, e).await,
        };

        let queue = match self.registry.attach(username).await {
            Ok(queue) => queue,
            Err(e) => return reject(username, sink, e.into()).await,
        };

        info!(
            username = %username,
            attachment_id = queue.attachment_id(),
            "Chat stream attached"
        );

        StreamSession::new(username, queue, self.inbound.clone())
            .run(&self.registry, frames, sink)
            .await
            .into_result()
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn verified(identity: Option<&str>) -> ChatResult<&str> {
    identity
        .filter(|username| !username.is_empty())
        .ok_or(ChatError::Unauthenticated)
}

/// End a stream that never got attached
async fn reject<K>(username: &str, sink: K, error: ChatError) -> ChatResult<()>
where
    K: Sink<Outbound, Error = TransportError>,
{
    warn!(username = %username, error = %error, "Chat stream rejected");

    let mut sink = Box::pin(sink);
    crate::connection::close_sink(username, &mut sink, error.close_code(), error.to_string()).await;
    Err(error)
}
