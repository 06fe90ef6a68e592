//! Repository traits
//!
//! Define async repository interfaces for store operations. Every method is
//! a single-row atomic operation so concurrent callers never interleave a
//! read with a dependent write.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use dramapass_types::{
    ContentItem, ContentSlug, PendingTransaction, ReferralCode, Subscriber, SubscriberId,
    SubscriberProfile, TransactionId, TransactionSuccess,
};

use crate::error::DbResult;

/// Subscriber repository trait
#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    /// Find a subscriber by platform user id
    async fn find(&self, id: SubscriberId) -> DbResult<Option<Subscriber>>;

    /// Find the subscriber owning a referral code
    async fn find_by_referral_code(&self, code: &ReferralCode) -> DbResult<Option<Subscriber>>;

    /// Return the existing record or insert one built from `new`, atomically
    async fn find_or_create(&self, new: NewSubscriber) -> DbResult<Subscriber>;

    /// Reset the daily quota to `limit` if the stored business day differs
    /// from `today`. Returns the updated record, or `None` if no reset was due.
    async fn reset_daily_limit(
        &self,
        id: SubscriberId,
        today: NaiveDate,
        limit: i32,
    ) -> DbResult<Option<Subscriber>>;

    /// Clear a VIP window that ended at or before `now`. Returns the updated
    /// record, or `None` if nothing was cleared.
    async fn clear_lapsed_vip(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>>;

    /// Decrement the daily quota if it is above zero, stamping the access
    /// time. Returns the remaining quota, or `None` when already exhausted.
    async fn consume_free_view(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> DbResult<Option<i32>>;

    /// Extend the VIP window by `days`, compounding onto a window that is
    /// still active at `now` and starting fresh from `now` otherwise.
    /// Returns the new expiry, or `None` if the subscriber does not exist.
    async fn extend_vip(
        &self,
        id: SubscriberId,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<DateTime<Utc>>>;

    /// Same as [`extend_vip`](Self::extend_vip), addressing the subscriber
    /// by the referral code they own
    async fn extend_vip_by_referral_code(
        &self,
        code: &ReferralCode,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<VipExtension>>;

    /// Manually grant (`days > 0`) or revoke (`days < 0`) VIP days.
    ///
    /// A grant compounds onto a window still active at `now` and starts
    /// fresh otherwise. A revocation shortens an active window; when less
    /// than one day would remain, the window and the VIP flag are cleared.
    /// Returns the updated record, or `None` if the subscriber does not exist.
    async fn adjust_vip(
        &self,
        id: SubscriberId,
        days: i32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>>;

    /// Record the redeemed referral code only if none is set yet.
    /// Returns whether the code was written.
    async fn set_referred_by(&self, id: SubscriberId, code: &ReferralCode) -> DbResult<bool>;
}

/// Input for creating a subscriber on first contact
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub id: SubscriberId,
    pub profile: SubscriberProfile,
    pub referral_code: ReferralCode,
    pub daily_limit: i32,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

/// Result of extending someone's VIP window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VipExtension {
    pub subscriber: SubscriberId,
    pub display_name: String,
    pub expire_time: DateTime<Utc>,
}

/// Pending transaction repository trait
#[async_trait]
pub trait PendingTransactionRepository: Send + Sync {
    /// Insert or refresh a pending entry keyed by `(payer, transaction_id)`.
    /// The duration is overwritten on every call; identity fields and the
    /// creation time are only set on first insert.
    async fn upsert(&self, pending: NewPendingTransaction) -> DbResult<PendingTransaction>;

    /// Find a pending entry by transaction id
    async fn find(&self, id: &TransactionId) -> DbResult<Option<PendingTransaction>>;

    /// Atomically mark an unclaimed entry as claimed
    async fn claim(&self, id: &TransactionId, now: DateTime<Utc>) -> DbResult<ClaimOutcome>;

    /// Clear the claim on an entry. Returns whether a claim was cleared.
    async fn release(&self, id: &TransactionId) -> DbResult<bool>;

    /// Delete an entry. Returns whether it existed.
    async fn remove(&self, id: &TransactionId) -> DbResult<bool>;

    /// Count outstanding entries by claim state
    async fn backlog(&self) -> DbResult<LedgerBacklog>;
}

/// Outstanding pending entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerBacklog {
    /// Waiting for a payment confirmation
    pub open: u64,
    /// Claimed by a reconciliation that has not retired them
    pub claimed: u64,
}

/// Input for recording a pending transaction
#[derive(Debug, Clone)]
pub struct NewPendingTransaction {
    pub transaction_id: TransactionId,
    pub payer: SubscriberId,
    pub duration_days: u32,
    pub now: DateTime<Utc>,
}

/// Outcome of claiming a pending entry for reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller now owns the entry
    Claimed(PendingTransaction),
    /// Another delivery already claimed it
    AlreadyClaimed,
    /// No entry with that id
    Missing,
}

/// Settlement record repository trait
#[async_trait]
pub trait TransactionSuccessRepository: Send + Sync {
    /// Append a settlement record. Returns `false` if one already exists for
    /// the transaction id; the existing record is left untouched.
    async fn record(&self, success: &TransactionSuccess) -> DbResult<bool>;

    /// Find the settlement record for a transaction
    async fn find(&self, id: &TransactionId) -> DbResult<Option<TransactionSuccess>>;

    /// Most recent settlements for a payer, newest first
    async fn list_by_payer(
        &self,
        payer: SubscriberId,
        limit: u32,
    ) -> DbResult<Vec<TransactionSuccess>>;
}

/// Content lookup trait
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Find a content item by slug
    async fn find_by_slug(&self, slug: &ContentSlug) -> DbResult<Option<ContentItem>>;

    /// Insert or replace a content item
    async fn upsert(&self, item: &ContentItem) -> DbResult<()>;
}
