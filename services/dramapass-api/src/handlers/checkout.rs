//! Checkout handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use dramapass_billing_core::CheckoutReceipt;
use dramapass_types::TransactionId;

use super::shared::{parse_user_id, record_op_duration};
use super::ProfileFields;
use crate::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub user_id: i64,
    pub package_id: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Deserialize)]
pub struct CancelCheckoutRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CancelCheckoutResponse {
    pub transaction_id: TransactionId,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/checkout
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(req): Json<CreateCheckoutRequest>,
) -> ApiResult<Json<CheckoutReceipt>> {
    let start = Instant::now();
    let user_id = parse_user_id(req.user_id)?;

    let result = state
        .billing
        .checkout
        .start(user_id, &req.package_id, req.profile.into())
        .await;
    record_op_duration("create_checkout", start, result.is_ok());
    let receipt = result?;

    metrics::counter!("dramapass_checkouts_created_total").increment(1);
    tracing::info!(
        user_id = %user_id,
        package = %receipt.package,
        transaction_id = %receipt.transaction_id,
        "Checkout created"
    );

    Ok(Json(receipt))
}

/// POST /api/v1/checkout/cancel
pub async fn cancel_checkout(
    State(state): State<AppState>,
    Json(req): Json<CancelCheckoutRequest>,
) -> ApiResult<Json<CancelCheckoutResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(req.user_id)?;

    let result = state.billing.checkout.cancel(user_id).await;
    record_op_duration("cancel_checkout", start, result.is_ok());

    Ok(Json(CancelCheckoutResponse {
        transaction_id: result?,
    }))
}
