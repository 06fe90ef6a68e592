//! Payment initiation and cancellation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use dramapass_db::Repositories;
use dramapass_types::{Package, SubscriberId, SubscriberProfile, TransactionId};

use crate::access::AccessEvaluator;
use crate::clock::{BusinessCalendar, Clock};
use crate::ledger::PendingTransactionLedger;
use crate::pricing::PricingResolver;
use crate::provider::PaymentProvider;
use crate::session::{ActiveCheckout, SessionStore};
use crate::BillingError;

/// Everything the frontend needs to show a payment QR
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutReceipt {
    pub transaction_id: TransactionId,
    pub package: Package,
    /// Amount requested, in rupiah
    pub amount: u64,
    /// QRIS payload
    pub payment_number: String,
    pub expires_at: DateTime<Utc>,
    /// Deadline in the business timezone
    pub expires_at_display: String,
}

/// Starts and cancels VIP purchases
#[derive(Clone)]
pub struct CheckoutService {
    access: AccessEvaluator,
    ledger: PendingTransactionLedger,
    provider: Arc<dyn PaymentProvider>,
    sessions: SessionStore,
    pricing: PricingResolver,
    calendar: BusinessCalendar,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    pub fn new(
        repos: &Repositories,
        access: AccessEvaluator,
        provider: Arc<dyn PaymentProvider>,
        sessions: SessionStore,
        pricing: PricingResolver,
        calendar: BusinessCalendar,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            access,
            ledger: PendingTransactionLedger::new(repos.pending.clone(), clock.clone()),
            provider,
            sessions,
            pricing,
            calendar,
            clock,
        }
    }

    /// Open a payment request for `package_id`. Nothing is written to the
    /// ledger unless the gateway accepts the request.
    #[instrument(skip(self, profile))]
    pub async fn start(
        &self,
        subscriber: SubscriberId,
        package_id: &str,
        profile: SubscriberProfile,
    ) -> Result<CheckoutReceipt, BillingError> {
        let quote = self.pricing.resolve_package(package_id)?;

        // Creates the record on first contact
        self.access.status(subscriber, profile).await?;

        let transaction_id = TransactionId::generate(self.calendar.local_naive(self.clock.now()));
        let payment = self
            .provider
            .create_payment(&transaction_id, quote.price)
            .await?;

        self.ledger
            .create_or_update(subscriber, &transaction_id, quote.days)
            .await?;

        self.sessions
            .set_active_checkout(
                subscriber,
                ActiveCheckout {
                    transaction_id: transaction_id.clone(),
                    package: quote.package,
                    amount: quote.price,
                },
            )
            .await;

        info!(
            subscriber = %subscriber,
            transaction_id = %transaction_id,
            package = %quote.package,
            "Checkout started"
        );

        Ok(CheckoutReceipt {
            transaction_id,
            package: quote.package,
            amount: quote.price,
            expires_at_display: self.calendar.format_deadline(payment.expired_at),
            expires_at: payment.expired_at,
            payment_number: payment.payment_number,
        })
    }

    /// Cancel the subscriber's outstanding checkout
    #[instrument(skip(self))]
    pub async fn cancel(&self, subscriber: SubscriberId) -> Result<TransactionId, BillingError> {
        let checkout = self
            .sessions
            .take_active_checkout(subscriber)
            .await
            .ok_or(BillingError::NoActiveCheckout(subscriber))?;

        if let Err(e) = self
            .provider
            .cancel_payment(&checkout.transaction_id, checkout.amount)
            .await
        {
            warn!(
                transaction_id = %checkout.transaction_id,
                error = %e,
                "Gateway cancellation failed"
            );
        }

        self.ledger.remove(&checkout.transaction_id).await;
        info!(subscriber = %subscriber, transaction_id = %checkout.transaction_id, "Checkout cancelled");
        Ok(checkout.transaction_id)
    }
}
