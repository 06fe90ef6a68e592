//! Dramapass API
//!
//! HTTP service in front of the billing core: the Pakasir payment webhook
//! plus the JSON API the chat frontend calls.
//!
//! ## REST Endpoints
//!
//! - `POST /webhook/pakasir` - Payment confirmation from the gateway
//! - `POST /api/v1/checkout` - Open a QRIS payment for a package
//! - `POST /api/v1/checkout/cancel` - Cancel the outstanding payment
//! - `POST /api/v1/content/access` - Request one content part
//! - `GET /api/v1/subscribers/{user_id}/status` - Account status
//! - `GET /api/v1/subscribers/{user_id}/transactions` - Purchase history
//! - `POST /api/v1/subscribers/{user_id}/referral` - Redeem a referral code
//! - `GET /api/v1/packages` - Package catalogue
//! - `POST /api/v1/admin/subscribers/{user_id}/vip` - Grant or revoke VIP days (bearer token)
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe with the pending-ledger backlog
//! - `GET /metrics` - Prometheus metrics

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Build the HTTP router with its middleware stack
pub fn build_router(
    state: AppState,
    request_timeout: Duration,
    metrics_handle: Option<PrometheusHandle>,
) -> Router {
    let api_v1 = Router::new()
        // Checkout routes
        .route("/checkout", post(handlers::create_checkout))
        .route("/checkout/cancel", post(handlers::cancel_checkout))
        // Content routes
        .route("/content/access", post(handlers::access_content))
        // Subscriber routes
        .route("/subscribers/{user_id}/status", get(handlers::get_status))
        .route(
            "/subscribers/{user_id}/transactions",
            get(handlers::list_transactions),
        )
        .route(
            "/subscribers/{user_id}/referral",
            post(handlers::redeem_referral),
        )
        .route("/packages", get(handlers::list_packages))
        // Admin routes (bearer token)
        .route(
            "/admin/subscribers/{user_id}/vip",
            post(handlers::adjust_vip),
        );

    // Webhook route (raw body, validated by the handler)
    let webhook_routes =
        Router::new().route("/webhook/pakasir", post(handlers::pakasir_webhook));

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
