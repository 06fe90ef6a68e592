//! Pakasir QRIS payment provider implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use dramapass_types::TransactionId;

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{PaymentProvider, PaymentRequest};

/// Pakasir payment provider
#[derive(Clone)]
pub struct PakasirProvider {
    client: Client,
    base_url: String,
    project: String,
    api_key: String,
}

#[derive(Serialize)]
struct TransactionBody<'a> {
    project: &'a str,
    order_id: &'a str,
    amount: u64,
    api_key: &'a str,
}

#[derive(Deserialize)]
struct CreateResponse {
    payment: PakasirPayment,
}

#[derive(Deserialize)]
struct PakasirPayment {
    payment_number: String,
    expired_at: DateTime<Utc>,
}

impl PakasirProvider {
    /// Create a new Pakasir provider
    pub fn new(config: &BillingConfig) -> Result<Self, BillingError> {
        let client = Client::builder()
            .timeout(config.gateway_timeout)
            .build()
            .map_err(|e| BillingError::Internal(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Create a provider sharing an existing HTTP client
    pub fn with_client(client: Client, config: &BillingConfig) -> Self {
        Self {
            client,
            base_url: config.pakasir_base_url.trim_end_matches('/').to_string(),
            project: config.pakasir_project.clone(),
            api_key: config.pakasir_api_key.clone(),
        }
    }

    /// POST a transaction body and return the successful response
    async fn post(
        &self,
        endpoint: &str,
        order_id: &TransactionId,
        amount: u64,
    ) -> Result<reqwest::Response, BillingError> {
        let url = format!("{}{endpoint}", self.base_url);
        let body = TransactionBody {
            project: &self.project,
            order_id: order_id.as_str(),
            amount,
            api_key: &self.api_key,
        };

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            error!(error = %e, "Pakasir API request failed");
            BillingError::Provider(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Pakasir API error");
            return Err(BillingError::Provider(format!("Pakasir API error: {status}")));
        }

        Ok(response)
    }
}

impl std::fmt::Debug for PakasirProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PakasirProvider")
            .field("base_url", &self.base_url)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentProvider for PakasirProvider {
    #[instrument(skip(self))]
    async fn create_payment(
        &self,
        order_id: &TransactionId,
        amount: u64,
    ) -> Result<PaymentRequest, BillingError> {
        debug!(amount, "Creating QRIS payment");

        let created: CreateResponse = self
            .post("/api/transactioncreate/qris", order_id, amount)
            .await?
            .json()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to parse Pakasir response");
                BillingError::Provider(format!("invalid gateway response: {e}"))
            })?;

        Ok(PaymentRequest {
            payment_number: created.payment.payment_number,
            expired_at: created.payment.expired_at,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_payment(
        &self,
        order_id: &TransactionId,
        amount: u64,
    ) -> Result<(), BillingError> {
        debug!(amount, "Cancelling QRIS payment");
        self.post("/api/transactioncancel", order_id, amount).await?;
        Ok(())
    }
}
