//! Payment provider abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dramapass_types::TransactionId;

use crate::BillingError;

/// Payment request issued by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// QRIS payload to render as a scannable image
    pub payment_number: String,
    /// Deadline after which the gateway voids the request
    pub expired_at: DateTime<Utc>,
}

/// Payment provider trait
///
/// Abstracts the QR payment gateway so checkout can be tested without it.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Open a payment request for `amount` rupiah under `order_id`
    async fn create_payment(
        &self,
        order_id: &TransactionId,
        amount: u64,
    ) -> Result<PaymentRequest, BillingError>;

    /// Void an open payment request
    async fn cancel_payment(&self, order_id: &TransactionId, amount: u64)
        -> Result<(), BillingError>;
}
