//! In-memory implementation of UserRepository

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use relay_core::error::DomainError;
use relay_core::traits::{RepoResult, UserRepository};

/// Credential table keyed by username
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: DashMap<String, String>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_password_hash(&self, username: &str) -> RepoResult<Option<String>> {
        Ok(self.users.get(username).map(|hash| hash.value().clone()))
    }

    async fn create(&self, username: &str, password_hash: &str) -> RepoResult<()> {
        match self.users.entry(username.to_string()) {
            Entry::Occupied(_) => Err(DomainError::UsernameTaken(username.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(password_hash.to_string());
                Ok(())
            }
        }
    }
}
