//! Shared handler utilities
//!
//! Boundary validation and metrics helpers used across handlers.

use std::time::Instant;

use serde_json::Number;

use dramapass_types::{ContentSlug, SubscriberId, TransactionId};

use crate::error::ApiError;

// ============================================================================
// Input Validation
// ============================================================================

/// Validate a gateway order id: non-empty, bounded, `[A-Za-z0-9_-]` only
pub fn parse_order_id(raw: &str) -> Result<TransactionId, ApiError> {
    TransactionId::parse(raw).map_err(|_| ApiError::BadRequest("invalid order_id".into()))
}

/// Validate a paid amount. Integral JSON numbers are accepted as-is; floats
/// only when they carry no fractional part.
pub fn parse_amount(raw: &Number) -> Result<u64, ApiError> {
    if let Some(amount) = raw.as_u64() {
        return Ok(amount);
    }

    match raw.as_f64() {
        Some(amount) if amount.is_finite() && amount >= 0.0 && amount.fract() == 0.0 => {
            if amount > u64::MAX as f64 {
                return Err(ApiError::BadRequest("amount out of range".into()));
            }
            Ok(amount as u64)
        }
        _ => Err(ApiError::BadRequest(
            "amount must be a non-negative whole number".into(),
        )),
    }
}

/// Validate a platform user id
pub fn parse_user_id(raw: i64) -> Result<SubscriberId, ApiError> {
    if raw <= 0 {
        return Err(ApiError::BadRequest("invalid user_id".into()));
    }
    Ok(SubscriberId(raw))
}

/// Validate a content slug
pub fn parse_slug(raw: &str) -> Result<ContentSlug, ApiError> {
    ContentSlug::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record HTTP operation duration with result label.
///
/// Labels: operation, result (ok/err)
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "dramapass_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}

// ============================================================================
// Tests
// ============================================================================
