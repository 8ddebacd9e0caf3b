//! Account gate
//!
//! Log-in-or-register against a user repository: an unknown username is
//! registered with the presented password, a known one must match it.

use async_trait::async_trait;
use relay_common::{JwtService, PasswordService};
use relay_core::{DomainError, IdentityGate, RepoResult, UserRepository};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// `IdentityGate` backed by a `UserRepository`, Argon2 hashes and JWTs
pub struct AccountGate {
    users: Arc<dyn UserRepository>,
    passwords: PasswordService,
    jwt: Arc<JwtService>,
}

impl AccountGate {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self {
            users,
            passwords: PasswordService::new(),
            jwt,
        }
    }

    fn check(&self, username: &str, password: &str, hash: &str) -> RepoResult<()> {
        match self.passwords.verify(password, hash) {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(username = %username, "Log-in failed: password mismatch");
                Err(DomainError::InvalidCredential)
            }
            Err(e) => Err(DomainError::Internal(e.to_string())),
        }
    }
}

#[async_trait]
impl IdentityGate for AccountGate {
    #[instrument(skip(self, password))]
    async fn authenticate(&self, username: &str, password: &str) -> RepoResult<()> {
        if let Some(hash) = self.users.find_password_hash(username).await? {
            return self.check(username, password, &hash);
        }

        let hash = self
            .passwords
            .hash(password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        match self.users.create(username, &hash).await {
            Ok(()) => {
                info!(username = %username, "Account registered");
                Ok(())
            }
            // Registered concurrently by someone else; verify against theirs
            Err(e) if e.is_conflict() => {
                let stored = self
                    .users
                    .find_password_hash(username)
                    .await?
                    .ok_or(DomainError::InvalidCredential)?;
                self.check(username, password, &stored)
            }
            Err(e) => Err(e),
        }
    }

    fn issue_token(&self, username: &str) -> RepoResult<String> {
        self.jwt
            .issue_token(username)
            .map_err(|e| DomainError::Internal(e.to_string()))
    }
}

impl std::fmt::Debug for AccountGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountGate").finish_non_exhaustive()
    }
}
