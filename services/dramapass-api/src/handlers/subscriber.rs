//! Subscriber handlers: account status, purchase history and referral redemption

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use dramapass_billing_core::AccountStatus;
use dramapass_types::{ReferralCode, SubscriberProfile, TransactionSuccess};

use super::shared::{parse_user_id, record_op_duration};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RedeemReferralRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemReferralResponse {
    pub referred_by: ReferralCode,
}

/// Default and maximum page size for purchase history
const HISTORY_DEFAULT_LIMIT: u32 = 10;
const HISTORY_MAX_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub transactions: Vec<TransactionSuccess>,
}

/// GET /api/v1/subscribers/{user_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<AccountStatus>> {
    let start = Instant::now();
    let user_id = parse_user_id(user_id)?;

    let result = state
        .billing
        .access
        .status(user_id, SubscriberProfile::default())
        .await;
    record_op_duration("get_status", start, result.is_ok());

    Ok(Json(result?))
}

/// GET /api/v1/subscribers/{user_id}/transactions
///
/// Settled purchases, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(user_id)?;
    let limit = query
        .limit
        .unwrap_or(HISTORY_DEFAULT_LIMIT)
        .clamp(1, HISTORY_MAX_LIMIT);

    let result = state.billing.engine.history(user_id, limit).await;
    record_op_duration("list_transactions", start, result.is_ok());

    Ok(Json(HistoryResponse {
        transactions: result?,
    }))
}

/// POST /api/v1/subscribers/{user_id}/referral
pub async fn redeem_referral(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<RedeemReferralRequest>,
) -> ApiResult<Json<RedeemReferralResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(user_id)?;

    let result = state.billing.referrals.redeem(user_id, &req.code).await;
    record_op_duration("redeem_referral", start, result.is_ok());
    let referred_by = result?;

    metrics::counter!("dramapass_referrals_redeemed_total").increment(1);
    tracing::info!(user_id = %user_id, code = %referred_by, "Referral code redeemed");

    Ok(Json(RedeemReferralResponse { referred_by }))
}
