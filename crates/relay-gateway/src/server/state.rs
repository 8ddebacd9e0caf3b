//! Relay server state
//!
//! Application state shared by every HTTP and WebSocket handler.

use crate::service::{AccountGate, ChatService};
use relay_common::{AppConfig, JwtService};
use relay_core::{MessageStore, UserRepository};
use relay_db::{MemoryMessageStore, MemoryUserRepository};
use std::sync::Arc;

/// Relay application state
#[derive(Clone)]
pub struct RelayState {
    chat: Arc<ChatService>,
    jwt: Arc<JwtService>,
    config: Arc<AppConfig>,
}

impl RelayState {
    /// Wire the account gate and chat service over the given storage
    ///
    /// Starts the broadcaster, so it must be called from within a Tokio runtime.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(&config.jwt.secret, config.jwt.token_expiry));
        let gate = Arc::new(AccountGate::new(users, jwt.clone()));
        let chat = Arc::new(ChatService::new(gate, store, &config.relay));

        Self {
            chat,
            jwt,
            config: Arc::new(config),
        }
    }

    /// State backed by in-memory storage
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryMessageStore::new()),
        )
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("chat", &self.chat)
            .field("config", &"AppConfig")
            .finish()
    }
}
