//! Dramapass Types - Shared domain types
//!
//! This crate contains domain types used across Dramapass services:
//! - Subscriber identity, VIP window and referral codes
//! - VIP packages and pricing
//! - Pending and settled payment transactions
//! - Serialized video content and access outcomes

pub mod access;
pub mod content;
pub mod error;
pub mod package;
pub mod subscriber;
pub mod transaction;

pub use access::*;
pub use content::*;
pub use error::*;
pub use package::*;
pub use subscriber::*;
pub use transaction::*;
