//! PostgreSQL repository implementations

mod content;
mod pending;
mod subscriber;
mod success;

pub use content::PgContentRepository;
pub use pending::PgPendingTransactionRepository;
pub use subscriber::PgSubscriberRepository;
pub use success::PgTransactionSuccessRepository;

use crate::DbError;

/// Map a unique-constraint violation to [`DbError::Conflict`]
fn conflict_on_unique(err: sqlx::Error, what: &str) -> DbError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DbError::Conflict(format!("{what}: {}", db.message()))
        }
        _ => DbError::Sqlx(err),
    }
}
