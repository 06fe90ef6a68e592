//! PostgreSQL settlement record repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use dramapass_types::{SubscriberId, TransactionId, TransactionSuccess};

use crate::error::DbResult;
use crate::models::{count_to_db, TransactionSuccessRow};
use crate::repo::TransactionSuccessRepository;

/// PostgreSQL settlement record repository
#[derive(Clone)]
pub struct PgTransactionSuccessRepository {
    pool: PgPool,
}

impl PgTransactionSuccessRepository {
    /// Create a new settlement record repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionSuccessRepository for PgTransactionSuccessRepository {
    async fn record(&self, success: &TransactionSuccess) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO transaction_successes (transaction_id, payer_user_id, activated_at, duration_days)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(success.transaction_id.as_str())
        .bind(success.payer.0)
        .bind(success.activated_at)
        .bind(count_to_db(success.duration_days))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, id: &TransactionId) -> DbResult<Option<TransactionSuccess>> {
        let row = sqlx::query_as::<_, TransactionSuccessRow>(
            r#"
            SELECT transaction_id, payer_user_id, activated_at, duration_days
            FROM transaction_successes
            WHERE transaction_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_by_payer(
        &self,
        payer: SubscriberId,
        limit: u32,
    ) -> DbResult<Vec<TransactionSuccess>> {
        let rows = sqlx::query_as::<_, TransactionSuccessRow>(
            r#"
            SELECT transaction_id, payer_user_id, activated_at, duration_days
            FROM transaction_successes
            WHERE payer_user_id = $1
            ORDER BY activated_at DESC
            LIMIT $2
            "#,
        )
        .bind(payer.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
