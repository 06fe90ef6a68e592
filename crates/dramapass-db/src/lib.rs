//! Dramapass DB - Store abstractions
//!
//! Keyed-document store for subscribers, pending transactions, settlement
//! records and content. Every mutation is a single-row atomic statement
//! (conditional update, upsert or guarded decrement); nothing relies on a
//! read followed by a write.
//!
//! # Example
//!
//! ```rust,ignore
//! use dramapass_db::{create_pool, run_migrations, Repositories};
//!
//! let pool = create_pool("postgres://localhost/dramapass").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::postgres(pool);
//!
//! let subscriber = repos.subscribers.find(SubscriberId(42)).await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

use std::sync::Arc;

pub use error::{DbError, DbResult};
pub use memory::MemoryRepositories;
pub use models::*;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;

/// All repositories bundled together behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub subscribers: Arc<dyn SubscriberRepository>,
    pub pending: Arc<dyn PendingTransactionRepository>,
    pub successes: Arc<dyn TransactionSuccessRepository>,
    pub content: Arc<dyn ContentRepository>,
}

impl Repositories {
    /// Create PostgreSQL-backed repositories from a pool
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            subscribers: Arc::new(pg::PgSubscriberRepository::new(pool.clone())),
            pending: Arc::new(pg::PgPendingTransactionRepository::new(pool.clone())),
            successes: Arc::new(pg::PgTransactionSuccessRepository::new(pool.clone())),
            content: Arc::new(pg::PgContentRepository::new(pool)),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
