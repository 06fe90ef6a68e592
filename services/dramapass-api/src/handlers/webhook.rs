//! Pakasir payment webhook handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Number;
use tracing::{error, info, warn};

use dramapass_billing_core::{PaymentNotification, ReconcileOutcome};

use super::shared::{parse_amount, parse_order_id, record_op_duration};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Fields read from the gateway callback; anything else is ignored
#[derive(Debug, Deserialize)]
pub struct PakasirWebhook {
    pub amount: Number,
    pub order_id: String,
}

impl PakasirWebhook {
    fn into_notification(self) -> ApiResult<PaymentNotification> {
        Ok(PaymentNotification {
            amount: parse_amount(&self.amount)?,
            order_id: parse_order_id(&self.order_id)?,
        })
    }
}

/// POST /webhook/pakasir
///
/// Acknowledges every well-formed callback at once so the gateway stops
/// retrying, whether or not it matches a pending transaction. The credit is
/// applied on a background task bounded by the engine's apply timeout.
pub async fn pakasir_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let notification = match parse_webhook(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!(error = %e, "Rejected malformed payment webhook");
            metrics::counter!("dramapass_webhooks_total", "outcome" => "rejected").increment(1);
            return e.into_response();
        }
    };

    info!(order_id = %notification.order_id, amount = notification.amount, "Payment webhook received");

    // The engine bounds its own steps and releases or keeps the claim
    // itself, so the task is never cut short from outside
    let engine = state.billing.engine.clone();
    tokio::spawn(async move {
        let start = Instant::now();
        let label = match engine.reconcile(&notification).await {
            Ok(outcome) => {
                match &outcome {
                    ReconcileOutcome::ApplyFailed { reason } => {
                        error!(order_id = %notification.order_id, reason = %reason, "Payment could not be applied");
                    }
                    ReconcileOutcome::Uncertain { reason } => {
                        error!(order_id = %notification.order_id, reason = %reason, "Payment needs manual review");
                    }
                    _ => {}
                }
                outcome.label()
            }
            Err(e) => {
                error!(order_id = %notification.order_id, error = %e, "Reconciliation failed");
                "error"
            }
        };

        metrics::counter!("dramapass_webhooks_total", "outcome" => label).increment(1);
        record_op_duration("reconcile", start, label == "retired");
    });

    (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response()
}

fn parse_webhook(body: &[u8]) -> ApiResult<PaymentNotification> {
    let payload: PakasirWebhook = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid webhook payload: {e}")))?;
    payload.into_notification()
}
