//! Common test utilities for dramapass-billing-core integration tests

pub mod fakes;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};

use dramapass_billing_core::{
    BillingConfig, BillingService, Clock, EngineParts, FixedClock, ReconciliationEngine,
    ReferralCalculator,
};
use dramapass_db::{
    MemoryRepositories, NewPendingTransaction, PendingTransactionRepository, Repositories,
};
use dramapass_types::{
    ContentItem, ContentSlug, ReferralCode, Subscriber, SubscriberId, TransactionId,
};

#[allow(unused_imports)]
pub use fakes::{FailingSuccesses, FaultySubscribers, MockProvider, RecordingNotifier};

/// 12:00 WIB on 9 March 2025
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 9, 5, 0, 0).unwrap()
}

/// Billing service over in-memory repositories and a frozen clock
pub struct Harness {
    pub repos: MemoryRepositories,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub provider: Arc<MockProvider>,
    pub config: BillingConfig,
    pub billing: BillingService,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        let repos = MemoryRepositories::new();
        let clock = Arc::new(FixedClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::default());
        let provider = Arc::new(MockProvider::new(clock.clone()));
        let config = BillingConfig::new("drama-trans", "test-key");
        let billing = BillingService::new(
            repos.repositories(),
            &config,
            provider.clone(),
            notifier.clone(),
            clock.clone(),
        );
        Self {
            repos,
            clock,
            notifier,
            provider,
            config,
            billing,
        }
    }

    /// Engine over `repos`, sharing this harness's clock, notifier and config
    pub fn engine_with(&self, repos: Repositories, apply_timeout: StdDuration) -> ReconciliationEngine {
        ReconciliationEngine::new(EngineParts {
            repos,
            pricing: self.billing.pricing.clone(),
            referral: ReferralCalculator::new(
                self.config.payer_bonus_cap_days,
                self.config.referrer_bonus_cap_days,
            ),
            notifier: self.notifier.clone(),
            sessions: self.billing.sessions.clone(),
            calendar: self.config.calendar.clone(),
            clock: self.clock.clone(),
            apply_timeout,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Insert a subscriber owning `code` with a full quota for today
    pub fn seed_subscriber(&self, id: i64, code: &str) -> Subscriber {
        let now = self.now();
        let subscriber = Subscriber {
            id: SubscriberId(id),
            display_name: format!("User {id}"),
            username: None,
            is_vip: false,
            expire_time: None,
            daily_limit: self.config.daily_free_views,
            last_access: now,
            last_access_day: self.config.calendar.business_day(now),
            referral_code: ReferralCode(code.to_string()),
            referred_by: None,
            created_at: now,
        };
        self.repos.subscribers.insert(subscriber.clone());
        subscriber
    }

    /// Replace a stored subscriber after `edit`
    pub fn update_subscriber(&self, id: i64, edit: impl FnOnce(&mut Subscriber)) {
        let mut subscriber = self.subscriber(id);
        edit(&mut subscriber);
        self.repos.subscribers.insert(subscriber);
    }

    pub fn subscriber(&self, id: i64) -> Subscriber {
        self.repos
            .subscribers
            .get(SubscriberId(id))
            .expect("subscriber exists")
    }

    /// Record a pending transaction as checkout would
    pub async fn seed_pending(&self, order_id: &str, payer: i64, days: u32) -> TransactionId {
        let id = TransactionId(order_id.to_string());
        self.repos
            .pending
            .upsert(NewPendingTransaction {
                transaction_id: id.clone(),
                payer: SubscriberId(payer),
                duration_days: days,
                now: self.now(),
            })
            .await
            .unwrap();
        id
    }

    /// Store one part of a series
    pub async fn seed_content(&self, series: &str, part: u32, total_parts: u32, vip_only: bool) -> ContentSlug {
        use dramapass_db::ContentRepository;

        let slug = ContentSlug::new(series, part);
        self.repos
            .content
            .upsert(&ContentItem {
                slug: slug.clone(),
                title: format!("{series} - Part {part}"),
                vip_only,
                part,
                total_parts,
                media_ref: format!("file-{series}-{part}"),
                uploaded_at: self.now() - Duration::days(1),
            })
            .await
            .unwrap();
        slug
    }
}
