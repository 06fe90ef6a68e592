//! Dramapass Billing Core - VIP subscription business logic
//!
//! Package pricing, per-request access control, referral bonuses and the
//! webhook-driven payment reconciliation engine, plus the payment gateway
//! and notification collaborators they talk to.
//!
//! # Example
//!
//! ```rust,ignore
//! use dramapass_billing_core::{BillingConfig, BillingService, LogNotifier, PakasirProvider, SystemClock};
//! use dramapass_db::Repositories;
//!
//! let config = BillingConfig::new("drama-trans", "api-key");
//! let provider = PakasirProvider::new(&config)?;
//! let billing = BillingService::new(
//!     Repositories::postgres(pool),
//!     &config,
//!     Arc::new(provider),
//!     Arc::new(LogNotifier),
//!     Arc::new(SystemClock),
//! );
//!
//! // Start a purchase
//! let receipt = billing.checkout.start(SubscriberId(42), "vip_7d", profile).await?;
//!
//! // Later, from the payment webhook
//! let outcome = billing.engine.reconcile(&notification).await?;
//! ```

pub mod access;
pub mod admin;
pub mod checkout;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod pakasir;
pub mod pricing;
pub mod provider;
pub mod reconcile;
pub mod referral;
pub mod service;
pub mod session;

pub use access::{AccessEvaluator, AccessOutcome, AccountStatus, ContentAccess};
pub use admin::{AdminService, VipAdjustment, MAX_ADJUST_DAYS};
pub use checkout::{CheckoutReceipt, CheckoutService};
pub use clock::{BusinessCalendar, Clock, FixedClock, SystemClock};
pub use config::BillingConfig;
pub use error::BillingError;
pub use ledger::PendingTransactionLedger;
pub use notify::{LogNotifier, NotifyError, Notifier, TelegramNotifier};
pub use pakasir::PakasirProvider;
pub use pricing::{AmountBreakdown, BreakdownLine, PackageQuote, PricingResolver};
pub use provider::{PaymentProvider, PaymentRequest};
pub use reconcile::{
    EngineParts, PaymentNotification, ReconcileOutcome, ReconcileState, ReconciliationEngine,
    ReferrerCredit, Settlement,
};
pub use referral::{ReferralBonus, ReferralCalculator, ReferralService};
pub use service::BillingService;
pub use session::{ActiveCheckout, SessionStore};
