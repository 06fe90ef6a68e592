//! Payment transaction types

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ParseError, SubscriberId};

/// Order identifier shared with the payment gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// Maximum accepted length
    pub const MAX_LEN: usize = 64;

    /// Generate a new id: `INV` + local timestamp + 3 random digits
    pub fn generate(local_now: NaiveDateTime) -> Self {
        let random = Uuid::new_v4();
        let bytes = random.as_bytes();
        let suffix = u16::from_be_bytes([bytes[0], bytes[1]]) % 1000;
        Self(format!("INV{}{suffix:03}", local_now.format("%Y%m%d%H%M%S")))
    }

    /// Validate an id received from an untrusted source
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s.is_empty()
            || s.len() > Self::MAX_LEN
            || !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ParseError::InvalidTransactionId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outstanding payment awaiting gateway confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Order id
    pub transaction_id: TransactionId,
    /// Subscriber who initiated the payment
    pub payer: SubscriberId,
    /// Nominal duration of the requested package, before bonuses
    pub duration_days: u32,
    /// Set once a webhook has claimed this entry for reconciliation
    pub claimed_at: Option<DateTime<Utc>>,
    /// First insert
    pub created_at: DateTime<Utc>,
    /// Last upsert
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record of a reconciled payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSuccess {
    /// Order id
    pub transaction_id: TransactionId,
    /// Subscriber who paid
    pub payer: SubscriberId,
    /// When the VIP extension was applied
    pub activated_at: DateTime<Utc>,
    /// Base duration paid for, excluding referral bonuses
    pub duration_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_generate_format() {
        let local = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();
        let id = TransactionId::generate(local);
        assert!(id.as_str().starts_with("INV20250309070501"));
        assert_eq!(id.as_str().len(), "INV".len() + 14 + 3);
        assert!(id.as_str()[3..].chars().all(|c| c.is_ascii_digit()));
        assert!(TransactionId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!(TransactionId::parse("").is_err());
        assert!(TransactionId::parse("INV 123").is_err());
        assert!(TransactionId::parse("INV123;DROP").is_err());
        assert!(TransactionId::parse(&"9".repeat(65)).is_err());
        assert!(TransactionId::parse("INV20250101000000123").is_ok());
        assert!(TransactionId::parse("order-1_a").is_ok());
    }
}
