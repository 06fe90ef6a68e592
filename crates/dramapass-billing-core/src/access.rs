//! Per-request access control
//!
//! Every content request runs the same ordered steps: find-or-create the
//! subscriber, reset the daily quota on a new business day, sweep a lapsed
//! VIP window, gate VIP-only content, then consume one free view. Each step
//! is one atomic store operation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use dramapass_db::{
    ContentRepository, DbError, NewSubscriber, Repositories, SubscriberRepository,
};
use dramapass_types::{
    AccessDenial, ContentItem, ContentSlug, Pagination, ReferralCode, Subscriber, SubscriberId,
    SubscriberProfile,
};

use crate::clock::{BusinessCalendar, Clock};
use crate::session::SessionStore;
use crate::{BillingConfig, BillingError};

/// Attempts at drawing an unused referral code on first contact
const REFERRAL_CODE_ATTEMPTS: usize = 3;

/// A granted content request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentAccess {
    pub item: ContentItem,
    pub pagination: Pagination,
    /// Subscriber had an active VIP window, no quota consumed
    pub vip: bool,
    /// Free views left today
    pub daily_limit: i32,
}

/// Result of evaluating a content request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted(ContentAccess),
    Denied(AccessDenial),
}

impl AccessOutcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Granted(_) => "granted",
            Self::Denied(AccessDenial::VipRequired) => "vip_required",
            Self::Denied(AccessDenial::QuotaExhausted) => "quota_exhausted",
        }
    }
}

/// Account overview shown by the status command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub subscriber: Subscriber,
    pub vip_active: bool,
    /// Whole hours left in the VIP window
    pub remaining_vip_hours: i64,
    /// VIP expiry in the business timezone
    pub expires_at_display: Option<String>,
    pub daily_limit: i32,
    pub daily_max: i32,
    /// Content part last sent to the subscriber
    pub last_watched: Option<ContentSlug>,
}

/// Decides whether a subscriber may receive a content item
#[derive(Clone)]
pub struct AccessEvaluator {
    subscribers: Arc<dyn SubscriberRepository>,
    content: Arc<dyn ContentRepository>,
    sessions: SessionStore,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
    daily_free_views: i32,
}

impl AccessEvaluator {
    pub fn new(
        repos: &Repositories,
        sessions: SessionStore,
        clock: Arc<dyn Clock>,
        config: &BillingConfig,
    ) -> Self {
        Self {
            subscribers: repos.subscribers.clone(),
            content: repos.content.clone(),
            sessions,
            clock,
            calendar: config.calendar.clone(),
            daily_free_views: config.daily_free_views,
        }
    }

    /// Evaluate a request for `slug`, consuming a free view when granted to a
    /// subscriber without an active VIP window
    #[instrument(skip(self, profile))]
    pub async fn evaluate(
        &self,
        subscriber_id: SubscriberId,
        profile: SubscriberProfile,
        slug: &ContentSlug,
    ) -> Result<AccessOutcome, BillingError> {
        let subscriber = self.prepare(subscriber_id, profile).await?;
        let now = self.clock.now();

        let item = self
            .content
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| BillingError::ContentNotFound(slug.to_string()))?;

        let vip = subscriber.vip_active(now);
        if item.vip_only && !vip {
            debug!(subscriber = %subscriber_id, slug = %slug, "VIP-only content refused");
            return Ok(AccessOutcome::Denied(AccessDenial::VipRequired));
        }

        let daily_limit = if vip {
            subscriber.daily_limit
        } else {
            let today = self.calendar.business_day(now);
            match self
                .subscribers
                .consume_free_view(subscriber_id, now, today)
                .await?
            {
                Some(remaining) => remaining,
                None => {
                    debug!(subscriber = %subscriber_id, "Daily quota exhausted");
                    return Ok(AccessOutcome::Denied(AccessDenial::QuotaExhausted));
                }
            }
        };

        self.sessions
            .set_last_delivered(subscriber_id, item.slug.clone())
            .await;

        Ok(AccessOutcome::Granted(ContentAccess {
            pagination: item.pagination(),
            item,
            vip,
            daily_limit,
        }))
    }

    /// Account overview after the same upsert, reset and sweep steps as a
    /// content request, without consuming quota
    #[instrument(skip(self, profile))]
    pub async fn status(
        &self,
        subscriber_id: SubscriberId,
        profile: SubscriberProfile,
    ) -> Result<AccountStatus, BillingError> {
        let subscriber = self.prepare(subscriber_id, profile).await?;
        let now = self.clock.now();

        let vip_active = subscriber.vip_active(now);
        let (remaining_vip_hours, expires_at_display) = match subscriber.expire_time {
            Some(expire) if vip_active => (
                (expire - now).num_hours(),
                Some(self.calendar.format_expiry(expire)),
            ),
            _ => (0, None),
        };

        Ok(AccountStatus {
            vip_active,
            remaining_vip_hours,
            expires_at_display,
            daily_limit: subscriber.daily_limit,
            daily_max: self.daily_free_views,
            last_watched: self.sessions.last_delivered(subscriber_id).await,
            subscriber,
        })
    }

    /// Find-or-create, daily reset and expiry sweep
    async fn prepare(
        &self,
        subscriber_id: SubscriberId,
        profile: SubscriberProfile,
    ) -> Result<Subscriber, BillingError> {
        let now = self.clock.now();
        let today = self.calendar.business_day(now);

        let mut subscriber = self.find_or_create(subscriber_id, profile).await?;

        if subscriber.last_access_day != today {
            subscriber = match self
                .subscribers
                .reset_daily_limit(subscriber_id, today, self.daily_free_views)
                .await?
            {
                Some(reset) => {
                    debug!(subscriber = %subscriber_id, "Daily quota reset");
                    reset
                }
                None => self.reload(subscriber_id).await?,
            };
        }

        if subscriber.vip_lapsed(now) {
            subscriber = match self.subscribers.clear_lapsed_vip(subscriber_id, now).await? {
                Some(cleared) => {
                    debug!(subscriber = %subscriber_id, "Lapsed VIP window cleared");
                    cleared
                }
                None => self.reload(subscriber_id).await?,
            };
        }

        Ok(subscriber)
    }

    async fn find_or_create(
        &self,
        subscriber_id: SubscriberId,
        profile: SubscriberProfile,
    ) -> Result<Subscriber, BillingError> {
        let now = self.clock.now();
        let mut last_conflict = None;

        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let new = NewSubscriber {
                id: subscriber_id,
                profile: profile.clone(),
                referral_code: ReferralCode::generate(),
                daily_limit: self.daily_free_views,
                now,
                today: self.calendar.business_day(now),
            };
            match self.subscribers.find_or_create(new).await {
                Ok(subscriber) => return Ok(subscriber),
                Err(DbError::Conflict(reason)) => {
                    warn!(subscriber = %subscriber_id, reason = %reason, "Referral code collision");
                    last_conflict = Some(DbError::Conflict(reason));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(last_conflict
            .map(BillingError::from)
            .unwrap_or_else(|| BillingError::Internal("subscriber creation failed".into())))
    }

    async fn reload(&self, subscriber_id: SubscriberId) -> Result<Subscriber, BillingError> {
        self.subscribers
            .find(subscriber_id)
            .await?
            .ok_or(BillingError::SubscriberNotFound(subscriber_id))
    }
}
