//! In-memory repositories
//!
//! `DashMap`-backed implementations of the repository traits for tests and
//! local development. Each mutation runs under the shard lock of its key,
//! which gives the same single-row atomicity as the PostgreSQL statements.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use dramapass_types::{
    ContentItem, ContentSlug, PendingTransaction, ReferralCode, Subscriber, SubscriberId,
    TransactionId, TransactionSuccess,
};

use crate::error::{DbError, DbResult};
use crate::repo::{
    ClaimOutcome, ContentRepository, LedgerBacklog, NewPendingTransaction, NewSubscriber,
    PendingTransactionRepository, SubscriberRepository, TransactionSuccessRepository,
    VipExtension,
};
use crate::Repositories;

/// Compounding extension shared by both extend operations
fn extend_window(subscriber: &mut Subscriber, days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = match subscriber.expire_time {
        Some(expire) if expire > now => expire,
        _ => now,
    };
    let expire = base + Duration::days(i64::from(days));
    subscriber.expire_time = Some(expire);
    subscriber.is_vip = true;
    expire
}

/// Manual grant or revocation; see [`SubscriberRepository::adjust_vip`]
fn adjust_window(subscriber: &mut Subscriber, days: i32, now: DateTime<Utc>) {
    let delta = Duration::days(i64::from(days));
    let adjusted = match subscriber.expire_time {
        Some(expire) if expire > now => {
            Some(expire + delta).filter(|e| *e >= now + Duration::days(1))
        }
        _ if days > 0 => Some(now + delta),
        _ => None,
    };
    subscriber.expire_time = adjusted;
    subscriber.is_vip = adjusted.is_some();
}

/// In-memory subscriber repository
#[derive(Default, Clone)]
pub struct MemorySubscriberRepository {
    subscribers: Arc<DashMap<SubscriberId, Subscriber>>,
    by_referral_code: Arc<DashMap<ReferralCode, SubscriberId>>,
}

impl MemorySubscriberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a subscriber directly
    pub fn insert(&self, subscriber: Subscriber) {
        self.by_referral_code
            .insert(subscriber.referral_code.clone(), subscriber.id);
        self.subscribers.insert(subscriber.id, subscriber);
    }

    /// Snapshot of a stored subscriber
    pub fn get(&self, id: SubscriberId) -> Option<Subscriber> {
        self.subscribers.get(&id).map(|r| r.value().clone())
    }

    /// Number of stored subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[async_trait]
impl SubscriberRepository for MemorySubscriberRepository {
    async fn find(&self, id: SubscriberId) -> DbResult<Option<Subscriber>> {
        Ok(self.get(id))
    }

    async fn find_by_referral_code(&self, code: &ReferralCode) -> DbResult<Option<Subscriber>> {
        let id = self.by_referral_code.get(code).map(|r| *r.value());
        Ok(id.and_then(|id| self.get(id)))
    }

    async fn find_or_create(&self, new: NewSubscriber) -> DbResult<Subscriber> {
        match self.subscribers.entry(new.id) {
            Entry::Occupied(existing) => Ok(existing.get().clone()),
            Entry::Vacant(slot) => {
                match self.by_referral_code.entry(new.referral_code.clone()) {
                    Entry::Occupied(_) => {
                        return Err(DbError::Conflict(format!(
                            "referral code: {} already taken",
                            new.referral_code
                        )))
                    }
                    Entry::Vacant(code) => {
                        code.insert(new.id);
                    }
                }
                let subscriber = Subscriber {
                    id: new.id,
                    display_name: new.profile.display_name,
                    username: new.profile.username,
                    is_vip: false,
                    expire_time: None,
                    daily_limit: new.daily_limit,
                    last_access: new.now,
                    last_access_day: new.today,
                    referral_code: new.referral_code,
                    referred_by: None,
                    created_at: new.now,
                };
                Ok(slot.insert(subscriber).value().clone())
            }
        }
    }

    async fn reset_daily_limit(
        &self,
        id: SubscriberId,
        today: NaiveDate,
        limit: i32,
    ) -> DbResult<Option<Subscriber>> {
        Ok(self.subscribers.get_mut(&id).and_then(|mut s| {
            (s.last_access_day != today).then(|| {
                s.daily_limit = limit;
                s.last_access_day = today;
                s.clone()
            })
        }))
    }

    async fn clear_lapsed_vip(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        Ok(self.subscribers.get_mut(&id).and_then(|mut s| {
            s.vip_lapsed(now).then(|| {
                s.expire_time = None;
                s.is_vip = false;
                s.clone()
            })
        }))
    }

    async fn consume_free_view(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> DbResult<Option<i32>> {
        Ok(self.subscribers.get_mut(&id).and_then(|mut s| {
            (s.daily_limit > 0).then(|| {
                s.daily_limit -= 1;
                s.last_access = now;
                s.last_access_day = today;
                s.daily_limit
            })
        }))
    }

    async fn extend_vip(
        &self,
        id: SubscriberId,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<DateTime<Utc>>> {
        Ok(self
            .subscribers
            .get_mut(&id)
            .map(|mut s| extend_window(&mut s, days, now)))
    }

    async fn extend_vip_by_referral_code(
        &self,
        code: &ReferralCode,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<VipExtension>> {
        let Some(id) = self.by_referral_code.get(code).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.subscribers.get_mut(&id).map(|mut s| {
            let expire_time = extend_window(&mut s, days, now);
            VipExtension {
                subscriber: s.id,
                display_name: s.display_name.clone(),
                expire_time,
            }
        }))
    }

    async fn adjust_vip(
        &self,
        id: SubscriberId,
        days: i32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        Ok(self.subscribers.get_mut(&id).map(|mut s| {
            adjust_window(&mut s, days, now);
            s.clone()
        }))
    }

    async fn set_referred_by(&self, id: SubscriberId, code: &ReferralCode) -> DbResult<bool> {
        Ok(self
            .subscribers
            .get_mut(&id)
            .is_some_and(|mut s| match s.referred_by {
                Some(_) => false,
                None => {
                    s.referred_by = Some(code.clone());
                    true
                }
            }))
    }
}

/// In-memory pending transaction repository
#[derive(Default, Clone)]
pub struct MemoryPendingTransactionRepository {
    pending: Arc<DashMap<TransactionId, PendingTransaction>>,
}

impl MemoryPendingTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored entry
    pub fn get(&self, id: &TransactionId) -> Option<PendingTransaction> {
        self.pending.get(id).map(|r| r.value().clone())
    }

    /// Number of outstanding entries
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[async_trait]
impl PendingTransactionRepository for MemoryPendingTransactionRepository {
    async fn upsert(&self, new: NewPendingTransaction) -> DbResult<PendingTransaction> {
        match self.pending.entry(new.transaction_id.clone()) {
            Entry::Occupied(mut existing) => {
                let entry = existing.get_mut();
                if entry.payer != new.payer {
                    return Err(DbError::Conflict(format!(
                        "transaction id: {} belongs to another payer",
                        new.transaction_id
                    )));
                }
                entry.duration_days = new.duration_days;
                entry.updated_at = new.now;
                Ok(entry.clone())
            }
            Entry::Vacant(slot) => {
                let entry = PendingTransaction {
                    transaction_id: new.transaction_id,
                    payer: new.payer,
                    duration_days: new.duration_days,
                    claimed_at: None,
                    created_at: new.now,
                    updated_at: new.now,
                };
                Ok(slot.insert(entry).value().clone())
            }
        }
    }

    async fn find(&self, id: &TransactionId) -> DbResult<Option<PendingTransaction>> {
        Ok(self.get(id))
    }

    async fn claim(&self, id: &TransactionId, now: DateTime<Utc>) -> DbResult<ClaimOutcome> {
        let Some(mut entry) = self.pending.get_mut(id) else {
            return Ok(ClaimOutcome::Missing);
        };
        if entry.claimed_at.is_some() {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        entry.claimed_at = Some(now);
        Ok(ClaimOutcome::Claimed(entry.clone()))
    }

    async fn release(&self, id: &TransactionId) -> DbResult<bool> {
        Ok(self
            .pending
            .get_mut(id)
            .is_some_and(|mut entry| entry.claimed_at.take().is_some()))
    }

    async fn remove(&self, id: &TransactionId) -> DbResult<bool> {
        Ok(self.pending.remove(id).is_some())
    }

    async fn backlog(&self) -> DbResult<LedgerBacklog> {
        Ok(self
            .pending
            .iter()
            .fold(LedgerBacklog::default(), |mut backlog, entry| {
                if entry.claimed_at.is_some() {
                    backlog.claimed += 1;
                } else {
                    backlog.open += 1;
                }
                backlog
            }))
    }
}

/// In-memory settlement record repository
#[derive(Default, Clone)]
pub struct MemoryTransactionSuccessRepository {
    successes: Arc<DashMap<TransactionId, TransactionSuccess>>,
}

impl MemoryTransactionSuccessRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored record
    pub fn get(&self, id: &TransactionId) -> Option<TransactionSuccess> {
        self.successes.get(id).map(|r| r.value().clone())
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.successes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty()
    }
}

#[async_trait]
impl TransactionSuccessRepository for MemoryTransactionSuccessRepository {
    async fn record(&self, success: &TransactionSuccess) -> DbResult<bool> {
        match self.successes.entry(success.transaction_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(success.clone());
                Ok(true)
            }
        }
    }

    async fn find(&self, id: &TransactionId) -> DbResult<Option<TransactionSuccess>> {
        Ok(self.get(id))
    }

    async fn list_by_payer(
        &self,
        payer: SubscriberId,
        limit: u32,
    ) -> DbResult<Vec<TransactionSuccess>> {
        let mut records: Vec<TransactionSuccess> = self
            .successes
            .iter()
            .filter(|r| r.payer == payer)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.activated_at.cmp(&a.activated_at));
        records.truncate(limit as usize);
        Ok(records)
    }
}

/// In-memory content repository
#[derive(Default, Clone)]
pub struct MemoryContentRepository {
    items: Arc<DashMap<ContentSlug, ContentItem>>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn find_by_slug(&self, slug: &ContentSlug) -> DbResult<Option<ContentItem>> {
        Ok(self.items.get(slug).map(|r| r.value().clone()))
    }

    async fn upsert(&self, item: &ContentItem) -> DbResult<()> {
        self.items.insert(item.slug.clone(), item.clone());
        Ok(())
    }
}

/// In-memory repositories, with typed handles kept for inspection
#[derive(Default, Clone)]
pub struct MemoryRepositories {
    pub subscribers: MemorySubscriberRepository,
    pub pending: MemoryPendingTransactionRepository,
    pub successes: MemoryTransactionSuccessRepository,
    pub content: MemoryContentRepository,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trait-object bundle sharing the same underlying maps
    pub fn repositories(&self) -> Repositories {
        Repositories {
            subscribers: Arc::new(self.subscribers.clone()),
            pending: Arc::new(self.pending.clone()),
            successes: Arc::new(self.successes.clone()),
            content: Arc::new(self.content.clone()),
        }
    }
}
