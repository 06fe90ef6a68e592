//! Billing configuration

use std::time::Duration;

use dramapass_types::Package;

use crate::clock::BusinessCalendar;

/// Default Pakasir API host
pub const DEFAULT_PAKASIR_BASE_URL: &str = "https://app.pakasir.com";

/// Billing configuration
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Pakasir project slug
    pub pakasir_project: String,
    /// Pakasir API key
    pub pakasir_api_key: String,
    /// Pakasir API host
    pub pakasir_base_url: String,
    /// Bound on a single gateway request
    pub gateway_timeout: Duration,
    /// Purchasable packages
    pub packages: Vec<Package>,
    /// Free views granted per business day
    pub daily_free_views: i32,
    /// Cap on the payer's referral bonus, in days
    pub payer_bonus_cap_days: u32,
    /// Cap on the referrer's referral bonus, in days
    pub referrer_bonus_cap_days: u32,
    /// Business timezone
    pub calendar: BusinessCalendar,
    /// Idle expiry of ephemeral session state
    pub session_ttl: Duration,
    /// Bound on each reconciliation step up to the payer's extension
    pub reconcile_timeout: Duration,
}

impl BillingConfig {
    /// Create a new billing config
    pub fn new(pakasir_project: impl Into<String>, pakasir_api_key: impl Into<String>) -> Self {
        Self {
            pakasir_project: pakasir_project.into(),
            pakasir_api_key: pakasir_api_key.into(),
            pakasir_base_url: DEFAULT_PAKASIR_BASE_URL.to_string(),
            gateway_timeout: Duration::from_secs(10),
            packages: Package::ALL.to_vec(),
            daily_free_views: 10,
            payer_bonus_cap_days: 7,
            referrer_bonus_cap_days: 3,
            calendar: BusinessCalendar::wib(),
            session_ttl: Duration::from_secs(3600),
            reconcile_timeout: Duration::from_secs(30),
        }
    }

    /// Point the gateway client at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.pakasir_base_url = base_url.into();
        self
    }

    /// Set the gateway request timeout
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    /// Restrict the package catalogue
    pub fn with_packages(mut self, packages: impl IntoIterator<Item = Package>) -> Self {
        self.packages = packages.into_iter().collect();
        self
    }

    /// Set the daily free-view quota
    pub fn with_daily_free_views(mut self, views: i32) -> Self {
        self.daily_free_views = views.max(0);
        self
    }

    /// Set the referral bonus caps
    pub fn with_bonus_caps(mut self, payer_days: u32, referrer_days: u32) -> Self {
        self.payer_bonus_cap_days = payer_days;
        self.referrer_bonus_cap_days = referrer_days;
        self
    }

    /// Set the business timezone
    pub fn with_calendar(mut self, calendar: BusinessCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Set the session idle expiry
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the reconciliation step timeout
    pub fn with_reconcile_timeout(mut self, timeout: Duration) -> Self {
        self.reconcile_timeout = timeout;
        self
    }
}
