//! PostgreSQL subscriber repository implementation

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use dramapass_types::{ReferralCode, Subscriber, SubscriberId};

use super::conflict_on_unique;
use crate::error::DbResult;
use crate::models::{count_to_db, subscriber_columns, SubscriberRow};
use crate::repo::{NewSubscriber, SubscriberRepository, VipExtension};

/// PostgreSQL subscriber repository
#[derive(Clone)]
pub struct PgSubscriberRepository {
    pool: PgPool,
}

impl PgSubscriberRepository {
    /// Create a new subscriber repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriberRepository for PgSubscriberRepository {
    async fn find(&self, id: SubscriberId) -> DbResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "SELECT ",
            subscriber_columns!(),
            " FROM subscribers WHERE user_id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_referral_code(&self, code: &ReferralCode) -> DbResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "SELECT ",
            subscriber_columns!(),
            " FROM subscribers WHERE referral_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_or_create(&self, new: NewSubscriber) -> DbResult<Subscriber> {
        // The no-op DO UPDATE makes RETURNING yield the existing row on conflict
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "INSERT INTO subscribers (user_id, display_name, username, is_vip, expire_time, \
             daily_limit, last_access, last_access_day, referral_code, created_at) \
             VALUES ($1, $2, $3, FALSE, NULL, $4, $5, $6, $7, $5) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id \
             RETURNING ",
            subscriber_columns!()
        ))
        .bind(new.id.0)
        .bind(&new.profile.display_name)
        .bind(&new.profile.username)
        .bind(new.daily_limit)
        .bind(new.now)
        .bind(new.today)
        .bind(new.referral_code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "referral code"))?;

        Ok(row.into())
    }

    async fn reset_daily_limit(
        &self,
        id: SubscriberId,
        today: NaiveDate,
        limit: i32,
    ) -> DbResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "UPDATE subscribers SET daily_limit = $3, last_access_day = $2 \
             WHERE user_id = $1 AND last_access_day <> $2 \
             RETURNING ",
            subscriber_columns!()
        ))
        .bind(id.0)
        .bind(today)
        .bind(limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn clear_lapsed_vip(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "UPDATE subscribers SET expire_time = NULL, is_vip = FALSE \
             WHERE user_id = $1 AND expire_time <= $2 \
             RETURNING ",
            subscriber_columns!()
        ))
        .bind(id.0)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn consume_free_view(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> DbResult<Option<i32>> {
        let remaining = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE subscribers
            SET daily_limit = daily_limit - 1, last_access = $2, last_access_day = $3
            WHERE user_id = $1 AND daily_limit > 0
            RETURNING daily_limit
            "#,
        )
        .bind(id.0)
        .bind(now)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        Ok(remaining)
    }

    async fn extend_vip(
        &self,
        id: SubscriberId,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let expire_time = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE subscribers
            SET expire_time = CASE WHEN expire_time > $2 THEN expire_time ELSE $2 END
                              + make_interval(days => $3),
                is_vip = TRUE
            WHERE user_id = $1
            RETURNING expire_time
            "#,
        )
        .bind(id.0)
        .bind(now)
        .bind(count_to_db(days))
        .fetch_optional(&self.pool)
        .await?;

        Ok(expire_time)
    }

    async fn extend_vip_by_referral_code(
        &self,
        code: &ReferralCode,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<VipExtension>> {
        let row = sqlx::query_as::<_, (i64, String, DateTime<Utc>)>(
            r#"
            UPDATE subscribers
            SET expire_time = CASE WHEN expire_time > $2 THEN expire_time ELSE $2 END
                              + make_interval(days => $3),
                is_vip = TRUE
            WHERE referral_code = $1
            RETURNING user_id, display_name, expire_time
            "#,
        )
        .bind(code.as_str())
        .bind(now)
        .bind(count_to_db(days))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, display_name, expire_time)| VipExtension {
            subscriber: SubscriberId(user_id),
            display_name,
            expire_time,
        }))
    }

    async fn adjust_vip(
        &self,
        id: SubscriberId,
        days: i32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        // SET expressions all read the pre-update row
        let row = sqlx::query_as::<_, SubscriberRow>(concat!(
            "UPDATE subscribers \
             SET expire_time = CASE \
                     WHEN expire_time > $2 \
                          AND expire_time + make_interval(days => $3) >= $2 + INTERVAL '1 day' \
                         THEN expire_time + make_interval(days => $3) \
                     WHEN expire_time > $2 THEN NULL \
                     WHEN $3 > 0 THEN $2 + make_interval(days => $3) \
                     ELSE NULL \
                 END, \
                 is_vip = CASE \
                     WHEN expire_time > $2 \
                         THEN expire_time + make_interval(days => $3) >= $2 + INTERVAL '1 day' \
                     ELSE $3 > 0 \
                 END \
             WHERE user_id = $1 \
             RETURNING ",
            subscriber_columns!()
        ))
        .bind(id.0)
        .bind(now)
        .bind(days)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn set_referred_by(&self, id: SubscriberId, code: &ReferralCode) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE subscribers SET referred_by_code = $2 WHERE user_id = $1 AND referred_by_code IS NULL",
        )
        .bind(id.0)
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
