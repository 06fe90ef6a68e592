//! Subscriber types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;

/// Stable numeric chat-platform user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Referral code a subscriber hands out to friends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferralCode(pub String);

impl ReferralCode {
    /// Maximum accepted length of a user-supplied code
    pub const MAX_LEN: usize = 32;

    /// Generate a fresh code: 4 random bytes, hex encoded
    pub fn generate() -> Self {
        let random = Uuid::new_v4();
        Self(hex::encode(&random.as_bytes()[..4]))
    }

    /// Parse a user-supplied code, trimming surrounding whitespace
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let code = s.trim();
        if code.is_empty()
            || code.len() > Self::MAX_LEN
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ParseError::InvalidReferralCode);
        }
        Ok(Self(code.to_lowercase()))
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Profile details captured on first contact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberProfile {
    /// First and last name joined
    pub display_name: String,
    /// Platform username, if the user has one
    pub username: Option<String>,
}

/// Subscriber record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Platform user id
    pub id: SubscriberId,
    /// Display name
    pub display_name: String,
    /// Platform username
    pub username: Option<String>,
    /// Cached VIP flag, kept consistent with `expire_time` by the access evaluator
    pub is_vip: bool,
    /// End of the VIP window
    pub expire_time: Option<DateTime<Utc>>,
    /// Free views remaining today
    pub daily_limit: i32,
    /// Last content access
    pub last_access: DateTime<Utc>,
    /// Business day of the last quota reset or consumption
    pub last_access_day: NaiveDate,
    /// Code this subscriber hands out
    pub referral_code: ReferralCode,
    /// Code this subscriber redeemed, set at most once
    pub referred_by: Option<ReferralCode>,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    /// VIP is active iff the window ends strictly after `now`
    pub fn vip_active(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.is_some_and(|expire| expire > now)
    }

    /// Whether a stale window is still stored and must be swept
    pub fn vip_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.expire_time.is_some_and(|expire| expire <= now)
    }
}
