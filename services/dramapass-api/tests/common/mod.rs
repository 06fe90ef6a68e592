//! Common test utilities for dramapass-api route tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use dramapass_api::{build_router, AppState};
use dramapass_billing_core::{
    BillingConfig, BillingError, BillingService, Clock, FixedClock, LogNotifier, PaymentProvider,
    PaymentRequest,
};
use dramapass_db::{ContentRepository, MemoryRepositories, NewPendingTransaction, PendingTransactionRepository};
use dramapass_types::{ContentItem, ContentSlug, SubscriberId, TransactionId};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// 12:00 WIB on 9 March 2025
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 9, 5, 0, 0).unwrap()
}

/// Gateway that answers locally
pub struct StubProvider {
    clock: Arc<FixedClock>,
    fail: AtomicBool,
}

impl StubProvider {
    #[allow(dead_code)]
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn create_payment(
        &self,
        order_id: &TransactionId,
        _amount: u64,
    ) -> Result<PaymentRequest, BillingError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BillingError::Provider("HTTP 503 from gateway".into()));
        }
        Ok(PaymentRequest {
            payment_number: format!("QRIS-{order_id}"),
            expired_at: self.clock.now() + Duration::minutes(15),
        })
    }

    async fn cancel_payment(&self, _order_id: &TransactionId, _amount: u64) -> Result<(), BillingError> {
        Ok(())
    }
}

/// Router over in-memory repositories, a frozen clock and a local gateway
pub struct TestApp {
    pub repos: MemoryRepositories,
    pub clock: Arc<FixedClock>,
    pub provider: Arc<StubProvider>,
    pub router: Router,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Self {
        let repos = MemoryRepositories::new();
        let clock = Arc::new(FixedClock::new(start_time()));
        let provider = Arc::new(StubProvider {
            clock: clock.clone(),
            fail: AtomicBool::new(false),
        });
        let config = BillingConfig::new("drama-trans", "test-key");
        let billing = BillingService::new(
            repos.repositories(),
            &config,
            provider.clone(),
            Arc::new(LogNotifier),
            clock.clone(),
        );
        let state = AppState::new(billing, None).with_admin_token(ADMIN_TOKEN);
        let router = build_router(state, StdDuration::from_secs(5), None);

        Self {
            repos,
            clock,
            provider,
            router,
        }
    }

    /// Send one request and decode the JSON body, if any
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: impl Into<String>) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.into()))
                .unwrap(),
        )
        .await
    }

    /// POST with an `Authorization: Bearer` header
    pub async fn post_json_as(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// Record a pending transaction for a payer who has already made contact
    pub async fn seed_pending(&self, order_id: &str, payer: i64, days: u32) {
        let (status, _) = self.get(&format!("/api/v1/subscribers/{payer}/status")).await;
        assert_eq!(status, StatusCode::OK);
        self.repos
            .pending
            .upsert(NewPendingTransaction {
                transaction_id: TransactionId(order_id.to_string()),
                payer: SubscriberId(payer),
                duration_days: days,
                now: self.clock.now(),
            })
            .await
            .unwrap();
    }

    pub async fn seed_content(&self, series: &str, part: u32, total_parts: u32, vip_only: bool) {
        self.repos
            .content
            .upsert(&ContentItem {
                slug: ContentSlug::new(series, part),
                title: format!("{series} - Part {part}"),
                vip_only,
                part,
                total_parts,
                media_ref: format!("file-{series}-{part}"),
                uploaded_at: self.clock.now() - Duration::days(1),
            })
            .await
            .unwrap();
    }

    /// Wait for the background reconciliation of `order_id` to settle
    pub async fn wait_for_settlement(&self, order_id: &str) -> bool {
        let id = TransactionId(order_id.to_string());
        for _ in 0..100 {
            if self.repos.successes.get(&id).is_some() && self.repos.pending.get(&id).is_none() {
                return true;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        false
    }
}
