//! Operator adjustments
//!
//! Manual VIP grants and revocations, for refunds, goodwill credit and
//! payments that ended `Uncertain`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use dramapass_db::SubscriberRepository;
use dramapass_types::SubscriberId;

use crate::clock::{BusinessCalendar, Clock};
use crate::BillingError;

/// Largest single adjustment, in days, either way
pub const MAX_ADJUST_DAYS: i32 = 3650;

/// VIP state after a manual adjustment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VipAdjustment {
    pub subscriber: SubscriberId,
    pub days: i32,
    pub is_vip: bool,
    pub expire_time: Option<DateTime<Utc>>,
    /// Expiry in the business timezone, e.g. "16 March 2025 - 12:00 WIB"
    pub expire_display: Option<String>,
}

/// Operator-only subscriber changes
#[derive(Clone)]
pub struct AdminService {
    subscribers: Arc<dyn SubscriberRepository>,
    calendar: BusinessCalendar,
    clock: Arc<dyn Clock>,
}

impl AdminService {
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        calendar: BusinessCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscribers,
            calendar,
            clock,
        }
    }

    /// Grant (`days > 0`) or revoke (`days < 0`) VIP days. A revocation
    /// that would leave less than a day clears VIP entirely.
    #[instrument(skip(self))]
    pub async fn adjust_vip(
        &self,
        subscriber: SubscriberId,
        days: i32,
    ) -> Result<VipAdjustment, BillingError> {
        if days == 0 || days.abs() > MAX_ADJUST_DAYS {
            return Err(BillingError::Validation(format!(
                "days must be non-zero and within ±{MAX_ADJUST_DAYS}"
            )));
        }

        let updated = self
            .subscribers
            .adjust_vip(subscriber, days, self.clock.now())
            .await?
            .ok_or(BillingError::SubscriberNotFound(subscriber))?;

        info!(
            subscriber = %subscriber,
            days,
            is_vip = updated.is_vip,
            expire_time = ?updated.expire_time,
            "VIP adjusted by operator"
        );

        Ok(VipAdjustment {
            subscriber,
            days,
            is_vip: updated.is_vip,
            expire_time: updated.expire_time,
            expire_display: updated
                .expire_time
                .map(|at| self.calendar.format_expiry(at)),
        })
    }
}
