//! Port traits for identity, credential storage, and message persistence

use async_trait::async_trait;

use crate::entities::InboundMessage;
use crate::error::DomainError;

/// Result type for port operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Identity
// ============================================================================

/// Verifies credentials and issues session tokens
#[async_trait]
pub trait IdentityGate: Send + Sync {
    /// Check `password` for `username`, registering the user on first sight
    ///
    /// Fails with [`DomainError::InvalidCredential`] if the user exists and the
    /// password does not match.
    async fn authenticate(&self, username: &str, password: &str) -> RepoResult<()>;

    /// Issue a bearer token whose subject is `username`
    fn issue_token(&self, username: &str) -> RepoResult<String>;
}

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get the stored password hash for a username
    async fn find_password_hash(&self, username: &str) -> RepoResult<Option<String>>;

    /// Create a user
    ///
    /// Fails with [`DomainError::UsernameTaken`] if the username exists.
    async fn create(&self, username: &str, password_hash: &str) -> RepoResult<()>;
}

// ============================================================================
// Message Store
// ============================================================================

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably append a message and return its sequence number
    ///
    /// Sequence numbers are strictly increasing across calls.
    async fn append(&self, message: &InboundMessage) -> RepoResult<u64>;
}
