//! Operator handlers

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use dramapass_billing_core::VipAdjustment;

use super::shared::{parse_user_id, record_op_duration};
use crate::error::ApiResult;
use crate::extractors::AdminAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdjustVipRequest {
    /// Positive to grant, negative to revoke
    pub days: i32,
}

/// POST /api/v1/admin/subscribers/{user_id}/vip
pub async fn adjust_vip(
    _admin: AdminAuth,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(req): Json<AdjustVipRequest>,
) -> ApiResult<Json<VipAdjustment>> {
    let start = Instant::now();
    let user_id = parse_user_id(user_id)?;

    let result = state.billing.admin.adjust_vip(user_id, req.days).await;
    record_op_duration("adjust_vip", start, result.is_ok());
    let adjustment = result?;

    metrics::counter!("dramapass_vip_adjustments_total").increment(1);

    Ok(Json(adjustment))
}
