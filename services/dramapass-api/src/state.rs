//! Application state for the Dramapass API service.

use std::sync::Arc;

use dramapass_billing_core::BillingService;
use dramapass_db::DbPool;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Billing service (pricing, access, checkout, referrals, reconciliation)
    pub billing: Arc<BillingService>,
    /// Database pool for readiness checks; absent when running on in-memory stores
    pub pool: Option<DbPool>,
    /// Bearer token for the admin routes; they are disabled without one
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    /// Create new application state
    pub fn new(billing: BillingService, pool: Option<DbPool>) -> Self {
        Self {
            billing: Arc::new(billing),
            pool,
            admin_token: None,
        }
    }

    /// Enable the admin routes
    pub fn with_admin_token(mut self, token: impl Into<Arc<str>>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.pool.is_some())
            .field("admin", &self.admin_token.is_some())
            .finish_non_exhaustive()
    }
}
