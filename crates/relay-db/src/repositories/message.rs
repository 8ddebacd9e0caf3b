//! PostgreSQL implementation of MessageStore

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use relay_core::entities::InboundMessage;
use relay_core::error::DomainError;
use relay_core::traits::{MessageStore, RepoResult};

use super::error::map_store_error;

/// PostgreSQL implementation of MessageStore
///
/// The sequence number is the `BIGSERIAL` id of the inserted row.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Create a new PgMessageStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, message), fields(sender = %message.sender))]
    async fn append(&self, message: &InboundMessage) -> RepoResult<u64> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO chat_messages (username, content, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(&message.sender)
        .bind(&message.text)
        .bind(message.received_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_store_error)?;

        u64::try_from(id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| DomainError::Store(format!("Invalid message id returned: {id}")))
    }
}
