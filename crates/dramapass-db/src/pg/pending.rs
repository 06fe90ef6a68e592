//! PostgreSQL pending transaction repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use dramapass_types::{PendingTransaction, TransactionId};

use super::conflict_on_unique;
use crate::error::DbResult;
use crate::models::{count_to_db, pending_columns, PendingTransactionRow};
use crate::repo::{
    ClaimOutcome, LedgerBacklog, NewPendingTransaction, PendingTransactionRepository,
};

/// PostgreSQL pending transaction repository
#[derive(Clone)]
pub struct PgPendingTransactionRepository {
    pool: PgPool,
}

impl PgPendingTransactionRepository {
    /// Create a new pending transaction repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PendingTransactionRepository for PgPendingTransactionRepository {
    async fn upsert(&self, pending: NewPendingTransaction) -> DbResult<PendingTransaction> {
        let row = sqlx::query_as::<_, PendingTransactionRow>(concat!(
            "INSERT INTO pending_transactions \
             (transaction_id, payer_user_id, duration_days, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (payer_user_id, transaction_id) \
             DO UPDATE SET duration_days = EXCLUDED.duration_days, updated_at = EXCLUDED.updated_at \
             RETURNING ",
            pending_columns!()
        ))
        .bind(pending.transaction_id.as_str())
        .bind(pending.payer.0)
        .bind(count_to_db(pending.duration_days))
        .bind(pending.now)
        .fetch_one(&self.pool)
        .await
        // Same transaction id under a different payer hits the primary key
        .map_err(|e| conflict_on_unique(e, "transaction id"))?;

        Ok(row.into())
    }

    async fn find(&self, id: &TransactionId) -> DbResult<Option<PendingTransaction>> {
        let row = sqlx::query_as::<_, PendingTransactionRow>(concat!(
            "SELECT ",
            pending_columns!(),
            " FROM pending_transactions WHERE transaction_id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn claim(&self, id: &TransactionId, now: DateTime<Utc>) -> DbResult<ClaimOutcome> {
        let claimed = sqlx::query_as::<_, PendingTransactionRow>(concat!(
            "UPDATE pending_transactions SET claimed_at = $2 \
             WHERE transaction_id = $1 AND claimed_at IS NULL \
             RETURNING ",
            pending_columns!()
        ))
        .bind(id.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = claimed {
            return Ok(ClaimOutcome::Claimed(row.into()));
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pending_transactions WHERE transaction_id = $1)",
        )
        .bind(id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists {
            ClaimOutcome::AlreadyClaimed
        } else {
            ClaimOutcome::Missing
        })
    }

    async fn release(&self, id: &TransactionId) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE pending_transactions SET claimed_at = NULL WHERE transaction_id = $1 AND claimed_at IS NOT NULL",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove(&self, id: &TransactionId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM pending_transactions WHERE transaction_id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn backlog(&self) -> DbResult<LedgerBacklog> {
        let (open, claimed) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE claimed_at IS NULL),
                   COUNT(*) FILTER (WHERE claimed_at IS NOT NULL)
            FROM pending_transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LedgerBacklog {
            open: u64::try_from(open).unwrap_or(0),
            claimed: u64::try_from(claimed).unwrap_or(0),
        })
    }
}
