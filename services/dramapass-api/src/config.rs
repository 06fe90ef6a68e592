//! Configuration for the Dramapass API service.

use std::str::FromStr;
use std::time::Duration;

use dramapass_billing_core::{BillingConfig, BusinessCalendar};

/// Dramapass API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Database URL
    pub database_url: String,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout for the JSON API
    pub request_timeout: Duration,
    /// Bound on acquiring a connection and on a single statement
    pub store_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
    /// Telegram bot token; notifications are only logged without it
    pub telegram_bot_token: Option<String>,
    /// Bearer token for the admin routes; they are disabled without it
    pub admin_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let http_port = parse_or(&lookup, "HTTP_PORT", 8080)?;
        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        let store_timeout_secs: u64 = parse_or(&lookup, "STORE_TIMEOUT_SECS", 10)?;
        let webhook_timeout_secs: u64 = parse_or(&lookup, "WEBHOOK_TIMEOUT_SECS", 30)?;

        // Metrics
        let metrics_enabled = lookup("METRICS_ENABLED")
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        // Pakasir gateway
        let pakasir_project =
            lookup("PAKASIR_PROJECT").unwrap_or_else(|| "drama-trans".to_string());
        let pakasir_api_key =
            lookup("PAKASIR_API_KEY").ok_or(ConfigError::Missing("PAKASIR_API_KEY"))?;

        // Business calendar
        let offset_hours: i32 = parse_or(&lookup, "BUSINESS_UTC_OFFSET_HOURS", 7)?;
        let tz_label = lookup("BUSINESS_TZ_LABEL").unwrap_or_else(|| "WIB".to_string());
        let calendar = BusinessCalendar::new(offset_hours, tz_label)
            .map_err(|_| ConfigError::Invalid("BUSINESS_UTC_OFFSET_HOURS"))?;

        let daily_free_views: i32 = parse_or(&lookup, "DAILY_FREE_VIEWS", 10)?;
        if daily_free_views < 0 {
            return Err(ConfigError::Invalid("DAILY_FREE_VIEWS"));
        }

        let mut billing = BillingConfig::new(pakasir_project, pakasir_api_key)
            .with_calendar(calendar)
            .with_daily_free_views(daily_free_views)
            .with_reconcile_timeout(Duration::from_secs(webhook_timeout_secs));
        if let Some(base_url) = lookup("PAKASIR_BASE_URL") {
            billing = billing.with_base_url(base_url);
        }

        let telegram_bot_token = lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty());
        let admin_token = lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(Self {
            http_port,
            database_url,
            billing,
            request_timeout: Duration::from_secs(request_timeout_secs),
            store_timeout: Duration::from_secs(store_timeout_secs),
            metrics_enabled,
            telegram_bot_token,
            admin_token,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/dramapass"),
        ("PAKASIR_API_KEY", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.billing.reconcile_timeout, Duration::from_secs(30));
        assert!(config.metrics_enabled);
        assert!(config.telegram_bot_token.is_none());
        assert!(config.admin_token.is_none());
        assert_eq!(config.billing.pakasir_project, "drama-trans");
        assert_eq!(config.billing.daily_free_views, 10);
        assert_eq!(config.billing.calendar.label(), "WIB");
    }

    #[test]
    fn test_missing_required() {
        assert!(matches!(
            load(&[("PAKASIR_API_KEY", "secret")]),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
        assert!(matches!(
            load(&[("DATABASE_URL", "postgres://x")]),
            Err(ConfigError::Missing("PAKASIR_API_KEY"))
        ));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_PORT", "eighty"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid("HTTP_PORT"))));

        let mut vars = REQUIRED.to_vec();
        vars.push(("DAILY_FREE_VIEWS", "-1"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid("DAILY_FREE_VIEWS"))
        ));
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PAKASIR_BASE_URL", "http://localhost:9999"),
            ("DAILY_FREE_VIEWS", "3"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("BUSINESS_TZ_LABEL", "WITA"),
            ("BUSINESS_UTC_OFFSET_HOURS", "8"),
            ("WEBHOOK_TIMEOUT_SECS", "5"),
            ("ADMIN_TOKEN", "s3cret"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.billing.pakasir_base_url, "http://localhost:9999");
        assert_eq!(config.billing.daily_free_views, 3);
        assert_eq!(config.telegram_bot_token.as_deref(), Some("123:abc"));
        assert_eq!(config.billing.calendar.label(), "WITA");
        assert_eq!(config.billing.reconcile_timeout, Duration::from_secs(5));
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
    }
}
