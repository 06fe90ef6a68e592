//! Billing errors

use thiserror::Error;

use dramapass_db::DbError;
use dramapass_types::{ParseError, ReferralCode, SubscriberId};

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Unknown package identifier
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// Malformed input rejected at the boundary
    #[error("validation error: {0}")]
    Validation(String),

    /// Subscriber not found
    #[error("subscriber not found: {0}")]
    SubscriberNotFound(SubscriberId),

    /// Content slug not found
    #[error("content not found: {0}")]
    ContentNotFound(String),

    /// No subscriber owns the referral code
    #[error("referral code not found: {0}")]
    ReferralCodeNotFound(String),

    /// Pending transaction not found
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// Nothing to cancel
    #[error("no active checkout for subscriber {0}")]
    NoActiveCheckout(SubscriberId),

    /// A referral code was already redeemed
    #[error("referral already set: {0}")]
    ReferralAlreadySet(ReferralCode),

    /// Subscriber tried to redeem their own code
    #[error("cannot redeem your own referral code")]
    SelfReferral,

    /// Payment gateway error
    #[error("provider error: {0}")]
    Provider(String),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] DbError),

    /// Operation exceeded its time budget
    #[error("timed out: {0}")]
    Timeout(&'static str),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SubscriberNotFound(_)
                | Self::ContentNotFound(_)
                | Self::ReferralCodeNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::NoActiveCheckout(_)
        ) || matches!(self, Self::Store(DbError::NotFound))
    }

    /// Check if retrying the action later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => !matches!(e, DbError::NotFound | DbError::Conflict(_)),
            Self::Timeout(_) => true,
            _ => false,
        }
    }

    /// Check if the input was rejected
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownPackage(_) | Self::Validation(_) | Self::SelfReferral
        )
    }

    /// Check if this is a payment gateway error
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl From<ParseError> for BillingError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnknownPackage(id) => Self::UnknownPackage(id),
            other => Self::Validation(other.to_string()),
        }
    }
}
