//! Dramapass API server binary

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::Router;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use dramapass_api::{build_router, AppState, Config};
use dramapass_billing_core::{
    BillingService, LogNotifier, Notifier, PakasirProvider, SystemClock, TelegramNotifier,
};
use dramapass_db::{PoolOptions, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("dramapass_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dramapass API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        business_tz = config.billing.calendar.label(),
        telegram = config.telegram_bot_token.is_some(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Create database pool
    let pool_options = PoolOptions {
        acquire_timeout: config.store_timeout,
        statement_timeout: config.store_timeout,
        ..PoolOptions::default()
    };
    let pool = dramapass_db::create_pool_with_options(&config.database_url, &pool_options).await?;
    dramapass_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created and migrations applied");

    // Collaborators
    let provider = PakasirProvider::new(&config.billing)?;
    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => {
            let client = reqwest::Client::builder()
                .timeout(config.billing.gateway_timeout)
                .build()?;
            Arc::new(TelegramNotifier::new(client, token.clone()))
        }
        None => {
            tracing::warn!("TELEGRAM_BOT_TOKEN not set, notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    // Create billing service
    let billing = BillingService::new(
        Repositories::postgres(pool.clone()),
        &config.billing,
        Arc::new(provider),
        notifier,
        Arc::new(SystemClock),
    );

    let mut state = AppState::new(billing, Some(pool));
    match &config.admin_token {
        Some(token) => state = state.with_admin_token(token.as_str()),
        None => tracing::warn!("ADMIN_TOKEN not set, admin routes are disabled"),
    }
    let app = build_router(state, config.request_timeout, metrics_handle);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Store round trips dominate; gateway calls reach into seconds
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("dramapass_operation_duration_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "dramapass_webhooks_total",
        "Payment webhooks by reconciliation outcome"
    );
    metrics::describe_counter!(
        "dramapass_content_requests_total",
        "Content requests by access outcome"
    );
    metrics::describe_counter!(
        "dramapass_checkouts_created_total",
        "Total payment requests opened"
    );
    metrics::describe_counter!(
        "dramapass_referrals_redeemed_total",
        "Total referral codes redeemed"
    );
    metrics::describe_counter!(
        "dramapass_vip_adjustments_total",
        "Total manual VIP adjustments"
    );
    metrics::describe_gauge!(
        "dramapass_pending_claimed",
        "Pending entries claimed but not retired, as of the last readiness check"
    );
    metrics::describe_histogram!(
        "dramapass_operation_duration_seconds",
        "Operation latency in seconds by operation and result"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
