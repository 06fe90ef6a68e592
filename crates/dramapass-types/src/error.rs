//! Common parse errors

use thiserror::Error;

/// Errors produced while parsing domain identifiers from untrusted input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown VIP package identifier
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// Malformed transaction identifier
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),

    /// Malformed content slug
    #[error("invalid content slug: {0}")]
    InvalidSlug(String),

    /// Malformed referral code
    #[error("invalid referral code")]
    InvalidReferralCode,
}
