//! Time source and business-timezone policy
//!
//! Every "now" in the crate comes from a [`Clock`] as a UTC instant. The
//! business day (quota resets) and every user-facing timestamp use the
//! single fixed offset held by [`BusinessCalendar`].

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::BillingError;

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Fixed-offset business timezone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
    label: String,
}

impl BusinessCalendar {
    /// Calendar at `offset_hours` east of UTC, displayed with `label`
    pub fn new(offset_hours: i32, label: impl Into<String>) -> Result<Self, BillingError> {
        let offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                BillingError::Validation(format!("invalid UTC offset: {offset_hours}h"))
            })?;
        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    /// Western Indonesia Time, UTC+7
    pub fn wib() -> Self {
        Self {
            offset: FixedOffset::east_opt(7 * 3600).unwrap_or(Utc.fix()),
            label: "WIB".to_string(),
        }
    }

    /// Timezone label shown next to formatted times
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Instant in business-local time
    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset)
    }

    /// Business-local wall clock time, used for transaction ids
    pub fn local_naive(&self, at: DateTime<Utc>) -> NaiveDateTime {
        self.local(at).naive_local()
    }

    /// Business day containing `at`
    pub fn business_day(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local(at).date_naive()
    }

    /// VIP expiry as shown to subscribers, e.g. `09 March 2025 - 14:05 WIB`
    pub fn format_expiry(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            self.local(at).format("%d %B %Y - %H:%M"),
            self.label
        )
    }

    /// Payment deadline as shown under a QR code, e.g. `09-03-2025 14:05:00`
    pub fn format_deadline(&self, at: DateTime<Utc>) -> String {
        self.local(at).format("%d-%m-%Y %H:%M:%S").to_string()
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::wib()
    }
}
