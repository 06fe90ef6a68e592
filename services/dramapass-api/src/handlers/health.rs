//! Health check handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use dramapass_db::LedgerBacklog;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub pending: PendingBacklog,
}

/// Pending ledger entries; a growing `claimed` count means payments are
/// stuck mid-reconciliation and need manual review
#[derive(Serialize)]
pub struct PendingBacklog {
    pub open: u64,
    pub claimed: u64,
}

impl From<LedgerBacklog> for PendingBacklog {
    fn from(backlog: LedgerBacklog) -> Self {
        Self {
            open: backlog.open,
            claimed: backlog.claimed,
        }
    }
}

/// Liveness probe - always returns OK if the service is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - reads the pending ledger through the store
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, StatusCode> {
    let database = if state.pool.is_some() {
        "connected"
    } else {
        "in-memory"
    };

    match state.billing.ledger.backlog().await {
        Ok(backlog) => {
            metrics::gauge!("dramapass_pending_claimed").set(backlog.claimed as f64);
            Ok(Json(ReadyResponse {
                status: "ready",
                database,
                pending: backlog.into(),
            }))
        }
        Err(e) => {
            tracing::error!(error = ?e, "Store health check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
