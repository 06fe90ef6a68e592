//! Content access handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use dramapass_billing_core::AccessOutcome;
use dramapass_types::{ContentItem, ContentSlug};

use super::shared::{parse_slug, parse_user_id, record_op_duration};
use super::ProfileFields;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContentAccessRequest {
    pub user_id: i64,
    pub slug: String,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

#[derive(Debug, Serialize)]
pub struct ContentAccessResponse {
    pub item: ContentItem,
    pub previous_part: Option<ContentSlug>,
    pub next_part: Option<ContentSlug>,
    pub vip: bool,
    pub daily_limit: i32,
}

/// POST /api/v1/content/access
///
/// Grants or refuses one content part. Non-VIP grants consume a free view.
pub async fn access_content(
    State(state): State<AppState>,
    Json(req): Json<ContentAccessRequest>,
) -> ApiResult<Json<ContentAccessResponse>> {
    let start = Instant::now();
    let user_id = parse_user_id(req.user_id)?;
    let slug = parse_slug(&req.slug)?;

    let result = state
        .billing
        .access
        .evaluate(user_id, req.profile.into(), &slug)
        .await;
    record_op_duration("access_content", start, result.is_ok());

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let label = if e.is_not_found() { "not_found" } else { "error" };
            metrics::counter!("dramapass_content_requests_total", "outcome" => label).increment(1);
            return Err(e.into());
        }
    };
    metrics::counter!("dramapass_content_requests_total", "outcome" => outcome.label())
        .increment(1);

    match outcome {
        AccessOutcome::Granted(access) => Ok(Json(ContentAccessResponse {
            previous_part: access.pagination.previous,
            next_part: access.pagination.next,
            item: access.item,
            vip: access.vip,
            daily_limit: access.daily_limit,
        })),
        AccessOutcome::Denied(denial) => Err(ApiError::Denied(denial)),
    }
}
