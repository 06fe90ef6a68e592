//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use dramapass_types::{
    ContentItem, ContentSlug, PendingTransaction, ReferralCode, Subscriber, SubscriberId,
    TransactionId, TransactionSuccess,
};

/// Column list shared by every statement returning a subscriber row
macro_rules! subscriber_columns {
    () => {
        "user_id, display_name, username, is_vip, expire_time, daily_limit, last_access, \
         last_access_day, referral_code, referred_by_code, created_at"
    };
}

/// Column list shared by every statement returning a pending transaction row
macro_rules! pending_columns {
    () => {
        "transaction_id, payer_user_id, duration_days, claimed_at, created_at, updated_at"
    };
}

pub(crate) use pending_columns;
pub(crate) use subscriber_columns;

/// Subscriber row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
    pub is_vip: bool,
    pub expire_time: Option<DateTime<Utc>>,
    pub daily_limit: i32,
    pub last_access: DateTime<Utc>,
    pub last_access_day: NaiveDate,
    pub referral_code: String,
    pub referred_by_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: SubscriberId(row.user_id),
            display_name: row.display_name,
            username: row.username,
            is_vip: row.is_vip,
            expire_time: row.expire_time,
            daily_limit: row.daily_limit,
            last_access: row.last_access,
            last_access_day: row.last_access_day,
            referral_code: ReferralCode(row.referral_code),
            referred_by: row.referred_by_code.map(ReferralCode),
            created_at: row.created_at,
        }
    }
}

/// Pending transaction row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PendingTransactionRow {
    pub transaction_id: String,
    pub payer_user_id: i64,
    pub duration_days: i32,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PendingTransactionRow> for PendingTransaction {
    fn from(row: PendingTransactionRow) -> Self {
        Self {
            transaction_id: TransactionId(row.transaction_id),
            payer: SubscriberId(row.payer_user_id),
            duration_days: count_from_db(row.duration_days),
            claimed_at: row.claimed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Settlement row from the database
#[derive(Debug, Clone, FromRow)]
pub struct TransactionSuccessRow {
    pub transaction_id: String,
    pub payer_user_id: i64,
    pub activated_at: DateTime<Utc>,
    pub duration_days: i32,
}

impl From<TransactionSuccessRow> for TransactionSuccess {
    fn from(row: TransactionSuccessRow) -> Self {
        Self {
            transaction_id: TransactionId(row.transaction_id),
            payer: SubscriberId(row.payer_user_id),
            activated_at: row.activated_at,
            duration_days: count_from_db(row.duration_days),
        }
    }
}

/// Content row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ContentItemRow {
    pub slug: String,
    pub title: String,
    pub vip_only: bool,
    pub part: i32,
    pub total_parts: i32,
    pub media_ref: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<ContentItemRow> for ContentItem {
    fn from(row: ContentItemRow) -> Self {
        Self {
            slug: ContentSlug(row.slug),
            title: row.title,
            vip_only: row.vip_only,
            part: count_from_db(row.part),
            total_parts: count_from_db(row.total_parts),
            media_ref: row.media_ref,
            uploaded_at: row.uploaded_at,
        }
    }
}

// Columns carry CHECK (>= 0) constraints
fn count_from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

/// Saturating conversion for binding a day count or part number
pub(crate) fn count_to_db(days: u32) -> i32 {
    i32::try_from(days).unwrap_or(i32::MAX)
}
