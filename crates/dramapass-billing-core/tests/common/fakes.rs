//! Fake collaborators

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use dramapass_billing_core::{
    BillingError, Clock, FixedClock, Notifier, NotifyError, PaymentProvider, PaymentRequest,
};
use dramapass_db::memory::{MemorySubscriberRepository, MemoryTransactionSuccessRepository};
use dramapass_db::{
    DbError, DbResult, NewSubscriber, SubscriberRepository, TransactionSuccessRepository,
    VipExtension,
};
use dramapass_types::{ReferralCode, Subscriber, SubscriberId, TransactionId, TransactionSuccess};

fn store_down() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

/// Notifier that keeps every message
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(SubscriberId, String)>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(SubscriberId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == SubscriberId(id))
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, to: SubscriberId, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((to, text.to_string()));
        Ok(())
    }
}

/// Gateway that answers locally
pub struct MockProvider {
    clock: Arc<FixedClock>,
    fail: AtomicBool,
    created: Mutex<Vec<(TransactionId, u64)>>,
    cancelled: Mutex<Vec<TransactionId>>,
}

#[allow(dead_code)]
impl MockProvider {
    pub fn new(clock: Arc<FixedClock>) -> Self {
        Self {
            clock,
            fail: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Make every call fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<(TransactionId, u64)> {
        self.created.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<TransactionId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_payment(
        &self,
        order_id: &TransactionId,
        amount: u64,
    ) -> Result<PaymentRequest, BillingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("gateway unavailable".into()));
        }
        self.created.lock().unwrap().push((order_id.clone(), amount));
        Ok(PaymentRequest {
            payment_number: format!("00020101021226QRIS{order_id}"),
            expired_at: self.clock.now() + Duration::minutes(15),
        })
    }

    async fn cancel_payment(&self, order_id: &TransactionId, _amount: u64) -> Result<(), BillingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("gateway unavailable".into()));
        }
        self.cancelled.lock().unwrap().push(order_id.clone());
        Ok(())
    }
}

/// Memory subscriber store with injectable faults
#[allow(dead_code)]
#[derive(Default)]
pub struct FaultySubscribers {
    inner: MemorySubscriberRepository,
    find_delay: Option<StdDuration>,
    extend_delay: Option<StdDuration>,
    /// Commit the extension, then report a store error
    lose_extend_response: bool,
    fail_referrer: bool,
    extend_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FaultySubscribers {
    pub fn new(inner: MemorySubscriberRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn with_find_delay(mut self, delay: StdDuration) -> Self {
        self.find_delay = Some(delay);
        self
    }

    pub fn with_extend_delay(mut self, delay: StdDuration) -> Self {
        self.extend_delay = Some(delay);
        self
    }

    pub fn losing_extend_response(mut self) -> Self {
        self.lose_extend_response = true;
        self
    }

    pub fn failing_referrer(mut self) -> Self {
        self.fail_referrer = true;
        self
    }

    /// Payer extensions sent so far
    pub fn extend_calls(&self) -> usize {
        self.extend_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriberRepository for FaultySubscribers {
    async fn find(&self, id: SubscriberId) -> DbResult<Option<Subscriber>> {
        if let Some(delay) = self.find_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.find(id).await
    }

    async fn find_by_referral_code(&self, code: &ReferralCode) -> DbResult<Option<Subscriber>> {
        self.inner.find_by_referral_code(code).await
    }

    async fn find_or_create(&self, new: NewSubscriber) -> DbResult<Subscriber> {
        self.inner.find_or_create(new).await
    }

    async fn reset_daily_limit(
        &self,
        id: SubscriberId,
        today: NaiveDate,
        limit: i32,
    ) -> DbResult<Option<Subscriber>> {
        self.inner.reset_daily_limit(id, today, limit).await
    }

    async fn clear_lapsed_vip(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        self.inner.clear_lapsed_vip(id, now).await
    }

    async fn consume_free_view(
        &self,
        id: SubscriberId,
        now: DateTime<Utc>,
        today: NaiveDate,
    ) -> DbResult<Option<i32>> {
        self.inner.consume_free_view(id, now, today).await
    }

    async fn extend_vip(
        &self,
        id: SubscriberId,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<DateTime<Utc>>> {
        self.extend_calls.fetch_add(1, Ordering::SeqCst);
        let extended = self.inner.extend_vip(id, days, now).await?;
        if let Some(delay) = self.extend_delay {
            tokio::time::sleep(delay).await;
        }
        if self.lose_extend_response {
            return Err(store_down());
        }
        Ok(extended)
    }

    async fn extend_vip_by_referral_code(
        &self,
        code: &ReferralCode,
        days: u32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<VipExtension>> {
        if self.fail_referrer {
            return Err(store_down());
        }
        self.inner.extend_vip_by_referral_code(code, days, now).await
    }

    async fn adjust_vip(
        &self,
        id: SubscriberId,
        days: i32,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Subscriber>> {
        self.inner.adjust_vip(id, days, now).await
    }

    async fn set_referred_by(&self, id: SubscriberId, code: &ReferralCode) -> DbResult<bool> {
        self.inner.set_referred_by(id, code).await
    }
}

/// Settlement store whose writes always fail
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingSuccesses {
    inner: MemoryTransactionSuccessRepository,
}

#[async_trait]
impl TransactionSuccessRepository for FailingSuccesses {
    async fn record(&self, _success: &TransactionSuccess) -> DbResult<bool> {
        Err(store_down())
    }

    async fn find(&self, id: &TransactionId) -> DbResult<Option<TransactionSuccess>> {
        self.inner.find(id).await
    }

    async fn list_by_payer(
        &self,
        payer: SubscriberId,
        limit: u32,
    ) -> DbResult<Vec<TransactionSuccess>> {
        self.inner.list_by_payer(payer, limit).await
    }
}
