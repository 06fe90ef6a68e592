//! Billing service
//!
//! Wires the core components over one set of repositories, one clock and
//! one session store.

use std::sync::Arc;

use dramapass_db::Repositories;

use crate::access::AccessEvaluator;
use crate::admin::AdminService;
use crate::checkout::CheckoutService;
use crate::clock::Clock;
use crate::ledger::PendingTransactionLedger;
use crate::notify::Notifier;
use crate::pricing::PricingResolver;
use crate::provider::PaymentProvider;
use crate::reconcile::{EngineParts, ReconciliationEngine};
use crate::referral::{ReferralCalculator, ReferralService};
use crate::session::SessionStore;
use crate::BillingConfig;

/// All core components, ready to share across request handlers
#[derive(Clone)]
pub struct BillingService {
    pub pricing: PricingResolver,
    pub access: AccessEvaluator,
    pub checkout: CheckoutService,
    pub referrals: ReferralService,
    pub engine: ReconciliationEngine,
    pub ledger: PendingTransactionLedger,
    pub admin: AdminService,
    pub sessions: SessionStore,
}

impl BillingService {
    /// Create a new billing service
    pub fn new(
        repos: Repositories,
        config: &BillingConfig,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pricing = PricingResolver::new(config.packages.iter().copied());
        let sessions = SessionStore::new(config.session_ttl);
        let access = AccessEvaluator::new(&repos, sessions.clone(), clock.clone(), config);
        let checkout = CheckoutService::new(
            &repos,
            access.clone(),
            provider,
            sessions.clone(),
            pricing.clone(),
            config.calendar.clone(),
            clock.clone(),
        );
        let referrals = ReferralService::new(repos.subscribers.clone());
        let ledger = PendingTransactionLedger::new(repos.pending.clone(), clock.clone());
        let admin = AdminService::new(
            repos.subscribers.clone(),
            config.calendar.clone(),
            clock.clone(),
        );
        let engine = ReconciliationEngine::new(EngineParts {
            repos,
            pricing: pricing.clone(),
            referral: ReferralCalculator::new(
                config.payer_bonus_cap_days,
                config.referrer_bonus_cap_days,
            ),
            notifier,
            sessions: sessions.clone(),
            calendar: config.calendar.clone(),
            clock,
            apply_timeout: config.reconcile_timeout,
        });

        Self {
            pricing,
            access,
            checkout,
            referrals,
            engine,
            ledger,
            admin,
            sessions,
        }
    }
}
