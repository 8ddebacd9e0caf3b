//! # relay-db
//!
//! Storage adapters implementing the `relay-core` ports.
//!
//! ## Overview
//!
//! - PostgreSQL via SQLx: connection pool, schema bootstrap, user and message repositories
//! - In-memory adapters with the same contracts, used when no database is configured
//!   and throughout the test suites
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, ensure_schema, DatabaseConfig, PgMessageStore};
//! use relay_core::MessageStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     ensure_schema(&pool).await?;
//!     let store = PgMessageStore::new(pool);
//!
//!     // Use the store...
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{MemoryMessageStore, MemoryUserRepository, StoredMessage};
pub use pool::{create_pool, ensure_schema, DatabaseConfig, PgPool};
pub use repositories::{PgMessageStore, PgUserRepository};
